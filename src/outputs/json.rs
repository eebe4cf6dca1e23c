//! JSON output for the summary report.
//!
//! The summary is written as pretty-printed JSON so an external dashboard or
//! report generator can consume it directly. Map keys are ordered, so the
//! same input always produces the same bytes.

use crate::error::Result;
use crate::models::SummaryStats;
use crate::utils::ensure_parent_dir;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write a [`SummaryStats`] to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_summary(stats: &SummaryStats, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    ensure_parent_dir(path).await?;
    fs::write(path, json).await?;
    info!(
        total = stats.total_articles,
        fraud_relevant = stats.fraud_relevant,
        "Wrote summary JSON"
    );
    Ok(())
}
