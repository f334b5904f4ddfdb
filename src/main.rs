//! Charity Crawler main entry point
//!
//! This is the command-line interface for the charity-rating site crawler.

use anyhow::Context;
use charity_crawler::config::{load_config_with_hash, Config};
use charity_crawler::crawler::Coordinator;
use charity_crawler::output::{generate_markdown_report, print_report, StagedCsvSink};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Charity Crawler: a polite charity-rating site crawler
///
/// Walks the site's alphabetical index, every directory page and every
/// charity detail page, and writes one CSV row per charity.
#[derive(Parser, Debug)]
#[command(name = "charity-crawler")]
#[command(version)]
#[command(about = "A polite charity-rating site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and schema, print them, and exit without crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the dataset here instead of the configured dataset-path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Fetch at most this many detail pages
    #[arg(long, value_name = "N")]
    max_details: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(output) = &cli.output {
        config.output.dataset_path = output.display().to_string();
    }
    if let Some(max) = cli.max_details {
        config.crawler.max_detail_pages = Some(max);
    }

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("charity_crawler=info,warn"),
            1 => EnvFilter::new("charity_crawler=debug,info"),
            2 => EnvFilter::new("charity_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: compiles the schema and prints what would run
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let schema = config
        .schema
        .compile()
        .context("Site schema does not compile")?;

    println!("=== Charity Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Allowed domains: {}", config.crawler.allowed_domains.join(", "));
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!(
        "  Minimum time between requests: {}ms",
        config.crawler.minimum_time_between_requests
    );
    println!(
        "  Max domain requests: {}",
        config.crawler.max_domain_requests
    );
    println!(
        "  Max consecutive failures: {}",
        config.crawler.max_consecutive_failures
    );
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    if let Some(max) = config.crawler.max_directory_pages {
        println!("  Max directory pages: {}", max);
    }
    if let Some(max) = config.crawler.max_detail_pages {
        println!("  Max detail pages: {}", max);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    if let Some(report) = &config.output.report_path {
        println!("  Report: {}", report);
    }

    println!("\nSite Schema:");
    println!("  Version: {}", schema.version);
    println!("  Index links: {}", config.schema.index_links.container);
    println!("  Directory links: {}", config.schema.directory_links.container);
    println!("  Rating container: {}", config.schema.rating_container.selector);
    println!(
        "  Attribute rows: {} (990) + {} (website)",
        schema.attributes_990.len(),
        schema.attributes_website.len()
    );
    let unmapped = schema.unmapped_financial_fields();
    if !unmapped.is_empty() {
        println!("  Unmapped financial fields: {}", unmapped.len());
    }

    println!("\n✓ Configuration and schema are valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let dataset_path = PathBuf::from(&config.output.dataset_path);
    let report_path = config.output.report_path.clone();

    let mut coordinator = Coordinator::new(config)?.with_config_hash(config_hash);

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight requests");
            token.cancel();
        }
    });

    let mut sink = StagedCsvSink::create(&dataset_path)
        .with_context(|| format!("Cannot create dataset {}", dataset_path.display()))?;

    let report = match coordinator.run(&mut sink).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            sink.discard();
            return Err(e.into());
        }
    };

    sink.commit()
        .with_context(|| format!("Cannot write dataset {}", dataset_path.display()))?;

    print_report(&report);

    if let Some(path) = report_path {
        generate_markdown_report(&report, Path::new(&path))
            .with_context(|| format!("Cannot write report {}", path))?;
        tracing::info!("Report written to {}", path);
    }

    Ok(())
}
