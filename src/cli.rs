//! Command-line interface definitions for the fraud news pipeline.
//!
//! This module defines the subcommands and options using the `clap` crate.
//! Every option can be provided via a command-line flag or an environment
//! variable.

use crate::aggregator::{DEFAULT_TOP_KEYWORDS, SummaryOptions, TimeBucket};
use crate::classifier::DEFAULT_TOP_K;
use crate::collector::CollectorConfig;
use crate::error::{PipelineError, Result};
use crate::scrapers::bankingdive::NEWS_URL;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Command-line arguments for the fraud news pipeline.
///
/// # Examples
///
/// ```sh
/// # Collect 20 fraud-related articles
/// bankdive_fraud collect -o fraud_articles.csv
///
/// # Classify and summarize them
/// bankdive_fraud analyze -i fraud_articles.csv -o fraud_analysis_results.csv
/// bankdive_fraud summarize -i fraud_analysis_results.csv -o fraud_summary.json
///
/// # Everything at once, with a custom taxonomy
/// bankdive_fraud --taxonomy taxonomy.yaml run --count 50 -d ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional YAML file overriding the fraud taxonomy and risk rubric
    #[arg(short, long, global = true, env = "BANKDIVE_TAXONOMY")]
    pub taxonomy: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect articles from the listing pages into a CSV file
    Collect(CollectArgs),
    /// Classify a CSV of collected articles
    Analyze(AnalyzeArgs),
    /// Summarize a CSV of classified articles into a JSON report
    Summarize(SummarizeArgs),
    /// Collect, analyze, and summarize in one go
    Run(RunArgs),
}

/// Where and how to collect.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Number of articles to collect
    #[arg(short = 'n', long, env = "BANKDIVE_COUNT", default_value_t = 20)]
    pub count: usize,

    /// Keep every article instead of only fraud-related ones
    #[arg(long, env = "BANKDIVE_ALL")]
    pub all: bool,

    /// Minimum delay between requests to the same host, in milliseconds
    #[arg(long, env = "BANKDIVE_DELAY_MS", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Consecutive listing pages without a new article before stopping
    #[arg(long, env = "BANKDIVE_MAX_EMPTY_PAGES", default_value_t = 3)]
    pub max_empty_pages: usize,

    /// Attempts per request, including the first
    #[arg(long, env = "BANKDIVE_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "BANKDIVE_TIMEOUT_SECS", default_value_t = 20)]
    pub timeout_secs: u64,

    /// Listing root URL
    #[arg(long, env = "BANKDIVE_BASE_URL", default_value = NEWS_URL)]
    pub base_url: String,
}

impl SourceArgs {
    /// Validate and convert into a [`CollectorConfig`].
    pub fn collector_config(&self) -> Result<CollectorConfig> {
        if self.count == 0 {
            return Err(PipelineError::Config("--count must be at least 1".into()));
        }
        if self.max_empty_pages == 0 {
            return Err(PipelineError::Config(
                "--max-empty-pages must be at least 1".into(),
            ));
        }
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| PipelineError::Config(format!("--base-url {}: {e}", self.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(PipelineError::Config(format!(
                "--base-url must be http(s): {}",
                self.base_url
            )));
        }
        Ok(CollectorConfig {
            base_url,
            target: self.count,
            fraud_only: !self.all,
            max_empty_pages: self.max_empty_pages,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output CSV path
    #[arg(short, long, env = "BANKDIVE_ARTICLES", default_value = "fraud_articles.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input CSV of collected articles
    #[arg(short, long, env = "BANKDIVE_ARTICLES", default_value = "fraud_articles.csv")]
    pub input: PathBuf,

    /// Output CSV path
    #[arg(short, long, env = "BANKDIVE_RESULTS", default_value = "fraud_analysis_results.csv")]
    pub output: PathBuf,

    /// Keywords kept per article
    #[arg(long, env = "BANKDIVE_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct SummaryArgs {
    /// Timeline granularity
    #[arg(long, env = "BANKDIVE_BUCKET", value_enum, default_value_t = TimeBucket::Day)]
    pub bucket: TimeBucket,

    /// Corpus-wide keywords reported
    #[arg(long, env = "BANKDIVE_TOP_KEYWORDS", default_value_t = DEFAULT_TOP_KEYWORDS)]
    pub top_keywords: usize,
}

impl From<SummaryArgs> for SummaryOptions {
    fn from(args: SummaryArgs) -> Self {
        SummaryOptions {
            bucket: args.bucket,
            top_keywords: args.top_keywords,
        }
    }
}

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Input CSV of classified articles
    #[arg(short, long, env = "BANKDIVE_RESULTS", default_value = "fraud_analysis_results.csv")]
    pub input: PathBuf,

    /// Output JSON path
    #[arg(short, long, env = "BANKDIVE_SUMMARY", default_value = "fraud_summary.json")]
    pub output: PathBuf,

    #[command(flatten)]
    pub summary: SummaryArgs,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory receiving the articles, results, and summary files
    #[arg(short = 'd', long, env = "BANKDIVE_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Keywords kept per article
    #[arg(long, env = "BANKDIVE_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    #[command(flatten)]
    pub summary: SummaryArgs,
}

impl RunArgs {
    pub fn articles_path(&self) -> PathBuf {
        self.output_dir.join("fraud_articles.csv")
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("fraud_analysis_results.csv")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("fraud_summary.json")
    }
}
