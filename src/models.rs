//! Data models for collected articles, their classifications, and summaries.
//!
//! This module defines the core data structures that flow through the pipeline:
//! - [`ArticleStub`]: Per-article metadata parsed from a listing page
//! - [`RawArticle`]: A collected article, optionally with its full body text
//! - [`ClassifiedArticle`]: A raw article enriched with category, risk, and sentiment
//! - [`SummaryStats`]: Aggregate counts derived from a set of classified articles
//!
//! Missing values (unknown publish date, failed body fetch) are explicit
//! `Option`s rather than sentinel strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Category label written for articles that matched no fraud keyword.
pub const NO_CATEGORY: &str = "none";

/// Article metadata as it appears on a listing page, before the full fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleStub {
    /// Canonical article URL; the identity used for deduplication.
    pub url: String,
    pub title: String,
    pub summary: String,
    pub publish_date: Option<NaiveDate>,
}

/// A collected article.
///
/// `url` is unique within one collection run. `body_text` is `None` when the
/// article page could not be fetched; the stub is still kept because title and
/// summary remain reportable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    /// The canonical source URL of the article.
    pub url: String,
    /// The article headline.
    pub title: String,
    /// The deck/summary shown on the listing page.
    pub summary: String,
    /// Publication date, when the listing or article page exposed one.
    pub publish_date: Option<NaiveDate>,
    /// Full body text extracted from the article page.
    pub body_text: Option<String>,
    /// Fraud keywords found by the collection pre-filter (title and summary only).
    pub matched_keywords: Vec<String>,
}

impl RawArticle {
    /// Build an article from a listing stub and the (possibly missing) body.
    pub fn from_stub(stub: ArticleStub, body_text: Option<String>, matched_keywords: Vec<String>) -> Self {
        Self {
            url: stub.url,
            title: stub.title,
            summary: stub.summary,
            publish_date: stub.publish_date,
            body_text,
            matched_keywords,
        }
    }

    /// Title, summary, and body joined into the text the classifier scores.
    pub fn analysis_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.summary.len() + self.body_text.as_ref().map_or(0, String::len) + 2,
        );
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.summary);
        if let Some(body) = &self.body_text {
            text.push(' ');
            text.push_str(body);
        }
        text
    }
}

/// Ordered risk scale. Declaration order is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    #[serde(rename = "Medium-High")]
    MediumHigh,
    High,
}

impl RiskLevel {
    /// Every level in ascending severity.
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Unknown,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::MediumHigh,
        RiskLevel::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "Unknown",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::MediumHigh => "Medium-High",
            RiskLevel::High => "High",
        }
    }

    /// Shift along the scale, saturating at `Low` and `High`.
    ///
    /// `Unknown` is reserved for articles that are not fraud relevant, so a
    /// shift never moves into or out of it.
    pub fn shifted(self, steps: i8) -> RiskLevel {
        if self == RiskLevel::Unknown || steps == 0 {
            return self;
        }
        let idx = RiskLevel::ALL.iter().position(|l| *l == self).unwrap_or(1) as i16;
        let target = (idx + steps as i16).clamp(1, (RiskLevel::ALL.len() - 1) as i16);
        RiskLevel::ALL[target as usize]
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown risk level: {s}"))
    }
}

/// Coarse polarity bucket derived from a sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ];

    /// Bucket a signed score: below -2 is negative, above 1 is positive.
    pub fn from_score(score: i32) -> Self {
        if score < -2 {
            SentimentLabel::Negative
        } else if score > 1 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Positive => "Positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw article plus everything the classifier derived from its text.
///
/// Produced once per article and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedArticle {
    pub article: RawArticle,
    /// Fraud keywords found anywhere in title, summary, or body.
    pub matched_keywords: Vec<String>,
    /// Winning fraud category; `None` when no keyword matched.
    pub category: Option<String>,
    pub risk_level: RiskLevel,
    pub sentiment_score: i32,
    pub top_keywords: Vec<String>,
}

impl ClassifiedArticle {
    /// Whether the article landed in any fraud category.
    pub fn is_fraud_relevant(&self) -> bool {
        self.category.is_some()
    }

    /// The category as written to tables, with `"none"` for no category.
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(NO_CATEGORY)
    }

    pub fn sentiment(&self) -> SentimentLabel {
        SentimentLabel::from_score(self.sentiment_score)
    }
}

/// Aggregate sentiment figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Article counts per polarity label; every label is always present.
    pub buckets: BTreeMap<SentimentLabel, usize>,
    pub mean: f64,
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// Short reference to a notable article in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
    pub category: String,
}

/// Summary statistics over one set of classified articles.
///
/// Always recomputed from scratch; an empty input yields zero counts in every
/// fixed bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_articles: usize,
    pub fraud_relevant: usize,
    /// Counts per assigned category, including `"none"` when present.
    pub category_counts: BTreeMap<String, usize>,
    /// Counts per risk level; every level is always present.
    pub risk_counts: BTreeMap<RiskLevel, usize>,
    pub sentiment: SentimentSummary,
    /// Counts per time bucket key (`YYYY-MM-DD` or `YYYY-MM`).
    pub timeline: BTreeMap<String, usize>,
    /// Articles without a publish date; excluded from `timeline`.
    pub undated: usize,
    /// Most frequent per-article keywords across the whole set.
    pub top_keywords: Vec<(String, usize)>,
    pub high_risk_articles: Vec<ArticleRef>,
}
