//! Output module for crawl records and reports
//!
//! This module handles:
//! - Writing records to a sink (CSV dataset or memory)
//! - Tracking crawl statistics in a [`CrawlReport`]
//! - Printing the report and rendering it as markdown

mod csv_output;
mod markdown;
pub mod stats;
mod traits;

pub use csv_output::{CsvSink, MemorySink, StagedCsvSink};
pub use markdown::{format_markdown_report, generate_markdown_report};
pub use stats::{print_report, CrawlReport, SkippedUrl, TierStats};
pub use traits::{OutputError, OutputResult, RecordSink};
