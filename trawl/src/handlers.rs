use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trawl_core::Settings;
use trawl_core::crawl::{CrawlOptions, execute_crawl};
use trawl_core::report::{ReportFormat, generate_report, save_report_to_file};
use trawl_scanner::{CrawlMode, CrawlerConfig, FetchStrategyKind};
use url::Url;

// Helper functions for crawl handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file. `#` starts a comment line.
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    let content = fs::read_to_string(&expanded)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some_and(|h| !h.is_empty())
    {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// Command-line switches layered over the loaded configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlFlags {
    pub sequential: bool,
    pub render: bool,
    pub all_hosts: bool,
    pub save_html: bool,
}

impl CrawlFlags {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            sequential: args.get_flag("sequential"),
            render: args.get_flag("render"),
            all_hosts: args.get_flag("all-hosts"),
            save_html: args.get_flag("save-html"),
        }
    }

    /// Switches only ever turn options on; an unset flag leaves the config alone.
    pub fn apply(&self, config: &mut CrawlerConfig) {
        if self.sequential {
            config.mode = CrawlMode::Sequential;
        }
        if self.render {
            config.strategy = FetchStrategyKind::Rendered;
        }
        if self.all_hosts {
            config.stay_in_domain = false;
        }
        if self.save_html {
            config.save_html = true;
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand `~` and give an extensionless path the report format's extension.
pub fn resolve_output_path(path: &PathBuf, format: ReportFormat) -> PathBuf {
    let mut resolved = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    if resolved.extension().is_none() {
        resolved.set_extension(format.extension());
    }
    resolved
}

fn load_settings(args: &ArgMatches) -> anyhow::Result<Settings> {
    let path = args.get_one::<String>("config").map(String::as_str);
    Settings::load(path).context("Failed to load configuration")
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let mut settings = load_settings(args)?;
    init_logging(&settings.log_level);
    CrawlFlags::from_matches(args).apply(&mut settings.crawler);

    let urls = load_urls_from_source(
        args.get_one::<Url>("url"),
        args.get_one::<PathBuf>("hosts-file"),
    )
    .map_err(|e| anyhow!(e))?;

    let max_pages = *args.get_one::<usize>("max-pages").unwrap_or(&10);
    let max_depth = *args.get_one::<usize>("max-depth").unwrap_or(&2);
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    if !quiet {
        eprintln!(
            "\n{} Crawling {} seed(s), up to {} pages each, depth {}",
            "→".blue(),
            urls.len(),
            max_pages,
            max_depth
        );
        eprintln!(
            "{} Mode: {:?}, strategy: {:?}, same host only: {}\n",
            "→".blue(),
            settings.crawler.mode,
            settings.crawler.strategy,
            settings.crawler.stay_in_domain
        );
    }

    let options = CrawlOptions {
        urls,
        max_pages,
        max_depth,
        config: settings.crawler.clone(),
        show_progress_bars: !quiet,
    };
    let progress = (!quiet).then(|| {
        let callback: trawl_core::CrawlProgressCallback = Arc::new(|msg: String| {
            eprintln!("{}", msg.bright_black());
        });
        callback
    });

    let summary = execute_crawl(options, progress)
        .await
        .context("Crawl could not start")?;

    let report = generate_report(&summary, format).context("Failed to render report")?;

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            let path = resolve_output_path(path, format);
            save_report_to_file(&report, &path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
            if !quiet {
                eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", report),
    }

    Ok(())
}

pub fn handle_config(args: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(args)?;
    print!("{}", settings.to_toml()?);
    Ok(())
}
