// Rendering of crawl results for the terminal or a file

use crate::crawl::{CrawlSummary, extract_url_path};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use trawl_scanner::PageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

pub fn generate_report(
    summary: &CrawlSummary,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(summary)),
        ReportFormat::Json => generate_json_report(&summary.pages),
    }
}

/// Pretty-printed JSON array of page records.
pub fn generate_json_report(pages: &[PageRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(pages)
}

fn status_label(status_code: u16) -> String {
    let code = status_code.to_string();
    match status_code {
        200..=299 => code.green().to_string(),
        300..=399 => code.cyan().to_string(),
        400..=499 => code.yellow().to_string(),
        500..=599 => code.red().to_string(),
        _ => code.white().to_string(),
    }
}

pub fn generate_text_report(summary: &CrawlSummary) -> String {
    let divider = "━".repeat(52);
    let mut report = String::new();
    report.push_str(&format!("{}\n\n", divider));
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages crawled: {}\n", summary.pages.len()));

    let paragraphs: usize = summary.pages.iter().map(|p| p.content.paragraphs.len()).sum();
    report.push_str(&format!("  Paragraphs extracted: {}\n", paragraphs));

    let tables: usize = summary.pages.iter().map(|p| p.content.tables.len()).sum();
    report.push_str(&format!("  Tables extracted: {}\n", tables));

    report.push_str(&format!("  Pages skipped: {}\n", summary.failures.len()));
    if !summary.rejected_seeds.is_empty() {
        report.push_str(&format!("  Seeds rejected: {}\n", summary.rejected_seeds.len()));
    }
    report.push_str(&format!("\n{}\n\n", divider));

    let mut by_host: BTreeMap<String, Vec<&PageRecord>> = BTreeMap::new();
    for page in &summary.pages {
        let host = page.host().unwrap_or_else(|| "unknown".to_string());
        by_host.entry(host).or_default().push(page);
    }

    for (host, pages) in &by_host {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} pages\n\n", pages.len()));

        for page in pages {
            let mut line = format!(
                "  {} {} [depth {}] {}",
                status_label(page.metadata.status_code),
                extract_url_path(&page.url),
                page.metadata.depth,
                page.title
            );

            if let Some(ref content_type) = page.metadata.content_type
                && !content_type.starts_with("text/html")
            {
                line.push_str(&format!(" {}", content_type.bright_black()));
            }

            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    if !summary.failures.is_empty() {
        report.push_str("## Skipped\n");
        for failure in &summary.failures {
            report.push_str(&format!(
                "  {} [depth {}] {}\n",
                failure.url,
                failure.depth,
                failure.reason.bright_black()
            ));
        }
        report.push('\n');
    }

    for seed in &summary.rejected_seeds {
        report.push_str(&format!("[!] {}: {}\n", seed.url, seed.reason));
    }

    report
}

pub fn save_report_to_file(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
