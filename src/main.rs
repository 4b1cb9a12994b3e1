//! # harvest CLI Application
//!
//! This module implements the command-line driver for the harvest library.
//!
//! ## Subcommands
//!
//! - `crawl`: Check, fetch and analyze a list of URLs
//! - `platform`: Discover articles from a platform's topic index and analyze them
//! - `analyze`: Analyze local HTML or Markdown files without network access
//!
//! All subcommands write the pattern records and the insight summary as
//! JSON files. Per-URL failures are logged and listed; they do not stop the
//! run.

mod telemetry;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use harvest::compliance::ComplianceConfig;
use harvest::crawler::storage::{DEFAULT_INSIGHTS_FILE, DEFAULT_RECORDS_FILE};
use harvest::crawler::{CrawlerConfig, Storage, StorageConfig};
use harvest::harvester::{HarvestReport, Harvester};
use harvest::insights::InsightError;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Compliance-gated content harvester and writing pattern analyzer",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check, fetch and analyze pages
    Crawl(CrawlArgs),

    /// Discover and analyze articles from a platform's topic index
    Platform(PlatformArgs),

    /// Analyze local HTML or Markdown files
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Where to write the pattern records
    #[arg(short, long, default_value = DEFAULT_RECORDS_FILE)]
    output: PathBuf,

    /// Where to write the insight summary
    #[arg(short, long, default_value = DEFAULT_INSIGHTS_FILE)]
    insights: PathBuf,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Longest crawl delay to honor, in milliseconds
    #[arg(long, default_value = "5000")]
    max_delay_ms: u64,

    /// Request timeout in seconds
    #[arg(long, default_value = "20")]
    timeout: u64,

    /// Additional domains to never scrape
    #[arg(long)]
    block: Vec<String>,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URLs to harvest
    #[arg(required = true)]
    urls: Vec<String>,

    /// Platform label stored in every record
    #[arg(short, long, default_value = "web")]
    platform: String,

    #[command(flatten)]
    fetch: FetchArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct PlatformArgs {
    /// Platform label stored in every record
    platform: String,

    /// The platform's topic index, e.g. https://dev.to/tags
    topics_url: String,

    /// Topic pages to visit
    #[arg(long, default_value = "3")]
    max_topics: usize,

    /// Articles to attempt across all topics
    #[arg(long, default_value = "10")]
    max_articles: usize,

    #[command(flatten)]
    fetch: FetchArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Platform label stored in every record
    #[arg(short, long, default_value = "local")]
    platform: String,

    /// Source URL stored in the records (defaults to the file path)
    #[arg(short, long)]
    url: Option<String>,

    /// Title of the document (defaults to the HTML title)
    #[arg(short, long, default_value = "")]
    title: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing_subscriber();

    match cli.command {
        Commands::Crawl(args) => crawl_command(args).await,
        Commands::Platform(args) => platform_command(args).await,
        Commands::Analyze(args) => analyze_command(args).await,
    }
}

fn build_harvester(args: &FetchArgs) -> anyhow::Result<Harvester> {
    let crawler = CrawlerConfig::builder()
        .timeout_secs(args.timeout)
        .max_crawl_delay_ms(args.max_delay_ms)
        .build();
    let compliance = args
        .block
        .iter()
        .fold(ComplianceConfig::builder(), |builder, domain| builder.block(domain))
        .build();

    Ok(Harvester::new(crawler, compliance)?)
}

fn print_failures(report: &HarvestReport) {
    for failure in &report.failures {
        println!("skipped {}: {}", failure.url, failure.reason);
    }
}

#[instrument(skip(args))]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let mut harvester = build_harvester(&args.fetch)?;

    let progress_bar = ProgressBar::new(args.urls.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let targets = args.urls.iter().map(|url| (args.platform.as_str(), url.as_str()));
    let report = harvester
        .harvest_all_with(targets, |url| {
            progress_bar.inc(1);
            progress_bar.set_message(url.to_string());
        })
        .await;
    progress_bar.finish_with_message("done");

    print_failures(&report);
    write_results(harvester, &args.output).await
}

#[instrument(skip(args))]
async fn platform_command(args: PlatformArgs) -> anyhow::Result<()> {
    let mut harvester = build_harvester(&args.fetch)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Harvesting {} from {}", args.platform, args.topics_url));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let report = harvester
        .harvest_platform(
            &args.platform,
            &args.topics_url,
            args.max_topics,
            args.max_articles,
        )
        .await;
    spinner.finish_with_message(format!("{} articles harvested", report.harvested));

    print_failures(&report);
    write_results(harvester, &args.output).await
}

#[instrument(skip(args))]
async fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut harvester = Harvester::new(CrawlerConfig::default(), ComplianceConfig::default())?;

    for file in &args.files {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let url = args
            .url
            .clone()
            .unwrap_or_else(|| file.display().to_string());

        let record = harvester.analyze(&args.platform, &url, &args.title, &text);
        info!(
            "{}: {} title, {} headings",
            file.display(),
            record.title_pattern.title_format,
            record.section_structure.total_headings
        );
    }

    write_results(harvester, &args.output).await
}

async fn write_results(harvester: Harvester, output: &OutputArgs) -> anyhow::Result<()> {
    let storage = Storage::with_config(StorageConfig {
        records_path: output.output.clone(),
        insights_path: output.insights.clone(),
    });

    let summary = match harvester.summary() {
        Ok(summary) => Some(summary),
        Err(InsightError::EmptyCorpus) => {
            warn!("No patterns were collected; skipping insight summary");
            None
        }
    };

    let records = harvester.into_records();
    storage
        .store_records(&records)
        .await
        .with_context(|| format!("Failed to write {}", storage.records_path().display()))?;

    match summary {
        Some(summary) => {
            storage
                .store_summary(&summary)
                .await
                .with_context(|| format!("Failed to write {}", storage.insights_path().display()))?;
            println!(
                "{} patterns from {} platforms written to {} and {}",
                summary.total_patterns,
                summary.platforms_analyzed.len(),
                storage.records_path().display(),
                storage.insights_path().display()
            );
        }
        None => println!("0 patterns written to {}", storage.records_path().display()),
    }

    Ok(())
}
