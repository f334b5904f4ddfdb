//! Markdown report generation
//!
//! Renders a [`CrawlReport`] as a human-readable markdown file: run
//! metadata, per-tier counts, record counts and the skipped URLs.

use crate::output::stats::CrawlReport;
use crate::output::traits::OutputResult;
use crate::state::Tier;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Skipped URLs listed individually before the list is truncated
const MAX_LISTED_SKIPS: usize = 100;

/// Writes the markdown report to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Charity Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    let status = if report.cancelled { "cancelled" } else { "completed" };
    md.push_str(&format!("- **Status**: {}\n", status));
    md.push_str(&format!("- **Config Hash**: {}\n", report.config_hash));
    md.push_str(&format!("- **Schema Version**: {}\n\n", report.schema_version));

    md.push_str("## Pages by Tier\n\n");
    md.push_str("| Tier | Attempted | Succeeded | Skipped | Filtered |\n");
    md.push_str("|------|-----------|-----------|---------|----------|\n");
    for tier in [Tier::Index, Tier::Directory, Tier::Detail] {
        let stats = report.tier(tier);
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            tier.as_str(),
            stats.attempted,
            stats.succeeded,
            stats.skipped,
            stats.filtered
        ));
    }
    md.push_str(&format!(
        "\n- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    md.push_str("## Records\n\n");
    md.push_str(&format!("- **Emitted**: {}\n", report.records_emitted));
    md.push_str(&format!(
        "- **Rated**: {}\n",
        report.records_emitted - report.identity_only
    ));
    md.push_str(&format!("- **Identity Only**: {}\n\n", report.identity_only));

    if !report.skipped_by_reason.is_empty() {
        md.push_str("## Skipped by Reason\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        for (reason, count) in &report.skipped_by_reason {
            md.push_str(&format!("| {} | {} |\n", reason.as_str(), count));
        }
        md.push('\n');
    }

    if !report.skipped.is_empty() {
        md.push_str("## Skipped URLs\n\n");
        md.push_str("| URL | Tier | Reason | Detail |\n");
        md.push_str("|-----|------|--------|--------|\n");
        for skip in report.skipped.iter().take(MAX_LISTED_SKIPS) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                skip.url,
                skip.tier.as_str(),
                skip.reason.as_str(),
                skip.message.replace('|', "\\|")
            ));
        }
        if report.skipped.len() > MAX_LISTED_SKIPS {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.skipped.len() - MAX_LISTED_SKIPS
            ));
        }
        md.push('\n');
    }

    md
}
