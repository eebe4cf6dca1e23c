//! # Bankdive Fraud
//!
//! A news pipeline that collects banking-industry articles, classifies their
//! fraud coverage, and summarizes the results.
//!
//! ## Features
//!
//! - Paginates the Banking Dive news listing with a polite, retrying fetcher
//! - Pre-filters stories by fraud keywords before fetching full article pages
//! - Classifies each article into a fraud category with a risk level,
//!   sentiment score, and top keywords
//! - Summarizes a classified set into category, risk, sentiment, and timeline counts
//!
//! ## Usage
//!
//! ```sh
//! bankdive_fraud collect -n 20 -o fraud_articles.csv
//! bankdive_fraud analyze -i fraud_articles.csv -o fraud_analysis_results.csv
//! bankdive_fraud summarize -i fraud_analysis_results.csv -o fraud_summary.json
//! bankdive_fraud run -d ./out
//! ```
//!
//! ## Architecture
//!
//! Each stage reads and writes files, so stages can be rerun independently:
//! 1. **Collect**: listing pages → deduplicated, filtered stubs → full articles (CSV)
//! 2. **Analyze**: raw articles → classified articles (CSV)
//! 3. **Summarize**: classified articles → summary statistics (JSON)

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod classifier;
mod cli;
mod collector;
mod error;
mod fetcher;
mod models;
mod outputs;
mod scrapers;
mod utils;

use aggregator::SummaryOptions;
use classifier::Classifier;
use classifier::taxonomy::{self, Lexicon};
use cli::{Cli, Command, SourceArgs};
use collector::Collector;
use fetcher::{HttpFetcher, RetryFetch};
use models::{ClassifiedArticle, RawArticle};
use outputs::{json, table};
use utils::ensure_parent_dir;

/// First retry delay; later retries back off exponentially from here.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("bankdive_fraud starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Installed before any stage runs and read-only afterwards.
    let lexicon = match &args.taxonomy {
        Some(path) => Lexicon::load(path)?,
        None => Lexicon::default(),
    };
    let lexicon = taxonomy::install(lexicon);

    match args.command {
        Command::Collect(cmd) => {
            collect(&cmd.source, &cmd.output, lexicon).await?;
        }
        Command::Analyze(cmd) => {
            let raw = table::read_raw(&cmd.input).await?;
            analyze(&raw, &cmd.output, lexicon, cmd.top_k).await?;
        }
        Command::Summarize(cmd) => {
            let classified = table::read_classified(&cmd.input).await?;
            summarize(&classified, &cmd.output, &cmd.summary.into()).await?;
        }
        Command::Run(cmd) => {
            let raw = collect(&cmd.source, &cmd.articles_path(), lexicon).await?;
            let classified = analyze(&raw, &cmd.results_path(), lexicon, cmd.top_k).await?;
            summarize(&classified, &cmd.summary_path(), &cmd.summary.into()).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Collect articles and write them to `output`.
///
/// Configuration problems and an unwritable output path are reported before
/// the first request goes out.
#[instrument(level = "info", skip_all, fields(output = %output.display(), count = source.count))]
async fn collect(
    source: &SourceArgs,
    output: &Path,
    lexicon: &Lexicon,
) -> Result<Vec<RawArticle>, Box<dyn Error>> {
    let config = source.collector_config()?;
    ensure_parent_dir(output).await?;

    let target = config.target;
    let http = HttpFetcher::new(source.timeout(), source.delay())?;
    let fetcher = RetryFetch::new(http, source.max_attempts, RETRY_BASE_DELAY);
    let (articles, stats) = Collector::new(&fetcher, &lexicon.taxonomy, config).run().await;

    if articles.len() < target {
        warn!(
            collected = articles.len(),
            target,
            pages = stats.pages_fetched,
            "Source exhausted before reaching the target count"
        );
    }
    table::write_raw(output, &articles).await?;
    Ok(articles)
}

#[instrument(level = "info", skip_all, fields(output = %output.display(), count = raw.len()))]
async fn analyze(
    raw: &[RawArticle],
    output: &Path,
    lexicon: &Lexicon,
    top_k: usize,
) -> Result<Vec<ClassifiedArticle>, Box<dyn Error>> {
    let classified = Classifier::new(lexicon).with_top_k(top_k).classify_all(raw);
    let relevant = classified.iter().filter(|c| c.is_fraud_relevant()).count();
    info!(relevant, total = classified.len(), "Classification complete");
    table::write_classified(output, &classified).await?;
    Ok(classified)
}

#[instrument(level = "info", skip_all, fields(output = %output.display(), count = classified.len()))]
async fn summarize(
    classified: &[ClassifiedArticle],
    output: &Path,
    options: &SummaryOptions,
) -> Result<(), Box<dyn Error>> {
    let stats = aggregator::summarize(classified, options);
    info!(
        fraud_relevant = stats.fraud_relevant,
        high_risk = stats.high_risk_articles.len(),
        undated = stats.undated,
        "Summary computed"
    );
    json::write_summary(&stats, output).await?;
    Ok(())
}
