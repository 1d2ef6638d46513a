use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("trawl")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("trawl")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site breadth-first and extract structured content from every \
                page.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The seed URL to crawl")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Stop a seed's crawl after this many pages")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"max-depth" <NUM>)
                        .required(false)
                        .help("Do not follow links found deeper than this")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("2"),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("TOML configuration file"),
                )
                .arg(
                    arg!(--"sequential")
                        .required(false)
                        .help("Fetch one page at a time instead of in batches")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"render")
                        .required(false)
                        .help("Render pages in a headless browser before extraction")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"all-hosts")
                        .required(false)
                        .help("Follow links to other hosts (default: stay on the seed's host)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"save-html")
                        .required(false)
                        .help("Keep the raw HTML of every page in the results")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file, adding the format's extension if missing (default: stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("config")
                .about("Print the effective configuration as TOML")
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("TOML configuration file"),
                ),
        )
}
