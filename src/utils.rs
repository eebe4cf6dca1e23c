//! Utility functions for URL identity, date parsing, text cleanup, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Canonical URL identity for deduplication
//! - Lenient publish-date parsing for the formats the news source uses
//! - Whitespace normalization and log truncation
//! - Output path validation

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// "Oct. 17, 2025", "October 17, 2025", "Sept. 3, 2025" with an optional
/// "Published"/"Updated" prefix.
static LONG_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2}),\s*(\d{4})\b").expect("valid date regex")
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid iso date regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary) with
/// an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Resolve `href` against `base` and strip the parts that do not identify an article.
///
/// Query strings and fragments are dropped and a trailing slash is enforced,
/// so `/news/foo/1?utm=x#top` and `/news/foo/1/` map to the same identity.
/// Returns `None` for non-HTTP links or unparseable input.
pub fn canonical_url(base: &Url, href: &str) -> Option<String> {
    let mut url = base.join(href.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url.to_string())
}

/// Parse the publish date formats seen on listing and article pages.
///
/// Accepts RFC 3339 timestamps, bare `YYYY-MM-DD` dates, and long-form US
/// dates with abbreviated or full month names. Unknown formats yield `None`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_publish_date("Published Oct. 17, 2025"), NaiveDate::from_ymd_opt(2025, 10, 17));
/// assert_eq!(parse_publish_date("2025-10-17T08:00:00-04:00"), NaiveDate::from_ymd_opt(2025, 10, 17));
/// ```
pub fn parse_publish_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Some(caps) = ISO_DATE.captures(raw) {
        let (y, m, d) = (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    let caps = LONG_DATE.captures(raw)?;
    let month = month_number(&caps[1])?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[2].parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Ensure the parent directory of an output file exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created or
/// written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    let probe_path = dir.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}
