//! Reduction of classified articles into [`SummaryStats`].
//!
//! Pure and order-insensitive for every count; list outputs (top keywords,
//! high-risk articles) follow input order for ties so repeated runs over the
//! same file produce identical JSON.

use crate::models::{ArticleRef, ClassifiedArticle, RiskLevel, SentimentLabel, SentimentSummary, SummaryStats};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

/// Corpus-wide keywords reported by default.
pub const DEFAULT_TOP_KEYWORDS: usize = 20;

/// Granularity of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimeBucket {
    #[default]
    Day,
    Month,
}

impl TimeBucket {
    pub fn key(&self, date: NaiveDate) -> String {
        match self {
            TimeBucket::Day => date.format("%Y-%m-%d").to_string(),
            TimeBucket::Month => format!("{:04}-{:02}", date.year(), date.month()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub bucket: TimeBucket,
    pub top_keywords: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            bucket: TimeBucket::Day,
            top_keywords: DEFAULT_TOP_KEYWORDS,
        }
    }
}

/// Summarize `articles`. An empty slice yields zeroed buckets, never an error.
pub fn summarize(articles: &[ClassifiedArticle], options: &SummaryOptions) -> SummaryStats {
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut risk_counts: BTreeMap<RiskLevel, usize> = RiskLevel::ALL.iter().map(|l| (*l, 0)).collect();
    let mut buckets: BTreeMap<SentimentLabel, usize> =
        SentimentLabel::ALL.iter().map(|l| (*l, 0)).collect();
    let mut timeline: BTreeMap<String, usize> = BTreeMap::new();
    let mut undated = 0;
    let mut keyword_counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut sentiment_total: i64 = 0;
    let mut high_risk_articles = Vec::new();

    for article in articles {
        *category_counts.entry(article.category_label().to_string()).or_default() += 1;
        *risk_counts.entry(article.risk_level).or_default() += 1;
        *buckets.entry(article.sentiment()).or_default() += 1;
        sentiment_total += i64::from(article.sentiment_score);

        match article.article.publish_date {
            Some(date) => *timeline.entry(options.bucket.key(date)).or_default() += 1,
            None => undated += 1,
        }

        for keyword in &article.top_keywords {
            let next = keyword_counts.len();
            keyword_counts.entry(keyword.as_str()).or_insert((0, next)).0 += 1;
        }

        if article.risk_level == RiskLevel::High {
            high_risk_articles.push(ArticleRef {
                title: article.article.title.clone(),
                url: article.article.url.clone(),
                category: article.category_label().to_string(),
            });
        }
    }

    let top_keywords = keyword_counts
        .into_iter()
        .sorted_by(|(_, (n_a, first_a)), (_, (n_b, first_b))| n_b.cmp(n_a).then(first_a.cmp(first_b)))
        .take(options.top_keywords)
        .map(|(k, (n, _))| (k.to_string(), n))
        .collect();

    let scores = articles.iter().map(|a| a.sentiment_score);
    let sentiment = SentimentSummary {
        buckets,
        mean: if articles.is_empty() {
            0.0
        } else {
            sentiment_total as f64 / articles.len() as f64
        },
        min: scores.clone().min(),
        max: scores.max(),
    };

    SummaryStats {
        total_articles: articles.len(),
        fraud_relevant: articles.iter().filter(|a| a.is_fraud_relevant()).count(),
        category_counts,
        risk_counts,
        sentiment,
        timeline,
        undated,
        top_keywords,
        high_risk_articles,
    }
}
