//! CSV persistence for raw and classified articles.
//!
//! Each stage reads and writes a whole file, so nothing is kept in memory
//! between runs. Missing values are written as empty cells, and list columns
//! are joined with [`LIST_SEPARATOR`].

use crate::error::{PipelineError, Result};
use crate::models::{ClassifiedArticle, NO_CATEGORY, RawArticle, RiskLevel};
use crate::utils::ensure_parent_dir;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const LIST_SEPARATOR: &str = "; ";

const RAW_HEADER: [&str; 6] = ["url", "title", "summary", "publish_date", "body_text", "matched_keywords"];
const CLASSIFIED_HEADER: [&str; 11] = [
    "url",
    "title",
    "summary",
    "publish_date",
    "body_text",
    "matched_keywords",
    "category",
    "risk_level",
    "sentiment_score",
    "sentiment",
    "top_keywords",
];

#[derive(Debug, Serialize, Deserialize)]
struct RawArticleRow {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    publish_date: String,
    #[serde(default)]
    body_text: String,
    #[serde(default)]
    matched_keywords: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifiedArticleRow {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    publish_date: String,
    #[serde(default)]
    body_text: String,
    #[serde(default)]
    matched_keywords: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    risk_level: String,
    #[serde(default)]
    sentiment_score: i32,
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    top_keywords: String,
}

fn join_list(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

fn split_list(cell: &str) -> Vec<String> {
    cell.split(LIST_SEPARATOR.trim())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional(cell: String) -> Option<String> {
    if cell.trim().is_empty() { None } else { Some(cell) }
}

impl From<&RawArticle> for RawArticleRow {
    fn from(a: &RawArticle) -> Self {
        Self {
            url: a.url.clone(),
            title: a.title.clone(),
            summary: a.summary.clone(),
            publish_date: a
                .publish_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            body_text: a.body_text.clone().unwrap_or_default(),
            matched_keywords: join_list(&a.matched_keywords),
        }
    }
}

impl From<RawArticleRow> for RawArticle {
    fn from(row: RawArticleRow) -> Self {
        let publish_date = NaiveDate::parse_from_str(row.publish_date.trim(), "%Y-%m-%d").ok();
        if publish_date.is_none() && !row.publish_date.trim().is_empty() {
            warn!(url = %row.url, value = %row.publish_date, "Unparseable publish_date; treating as undated");
        }
        Self {
            matched_keywords: split_list(&row.matched_keywords),
            url: row.url,
            title: row.title,
            summary: row.summary,
            publish_date,
            body_text: optional(row.body_text),
        }
    }
}

impl From<&ClassifiedArticle> for ClassifiedArticleRow {
    fn from(c: &ClassifiedArticle) -> Self {
        let raw = RawArticleRow::from(&c.article);
        Self {
            url: raw.url,
            title: raw.title,
            summary: raw.summary,
            publish_date: raw.publish_date,
            body_text: raw.body_text,
            matched_keywords: join_list(&c.matched_keywords),
            category: c.category_label().to_string(),
            risk_level: c.risk_level.to_string(),
            sentiment_score: c.sentiment_score,
            sentiment: c.sentiment().to_string(),
            top_keywords: join_list(&c.top_keywords),
        }
    }
}

impl From<ClassifiedArticleRow> for ClassifiedArticle {
    fn from(row: ClassifiedArticleRow) -> Self {
        let category = optional(row.category).filter(|c| c != NO_CATEGORY);
        let risk_level = row.risk_level.parse().unwrap_or(RiskLevel::Unknown);
        let article = RawArticle::from(RawArticleRow {
            url: row.url,
            title: row.title,
            summary: row.summary,
            publish_date: row.publish_date,
            body_text: row.body_text,
            matched_keywords: row.matched_keywords,
        });
        Self {
            matched_keywords: article.matched_keywords.clone(),
            article,
            category,
            risk_level,
            sentiment_score: row.sentiment_score,
            top_keywords: split_list(&row.top_keywords),
        }
    }
}

/// Serialize `rows` to `path`. An empty set still gets its header line.
async fn write_rows<R: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = R>,
) -> Result<()> {
    ensure_parent_dir(path).await?;
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut written = 0usize;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }
    if written == 0 {
        writer.write_record(header)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))?;
    fs::write(path, bytes).await?;
    Ok(())
}

async fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let bytes = fs::read(path).await.map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Write collected articles, header first, in the given order.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = articles.len()))]
pub async fn write_raw(path: &Path, articles: &[RawArticle]) -> Result<()> {
    write_rows(path, &RAW_HEADER, articles.iter().map(RawArticleRow::from)).await?;
    info!("Wrote raw articles");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_raw(path: &Path) -> Result<Vec<RawArticle>> {
    let rows: Vec<RawArticleRow> = read_rows(path).await?;
    info!(count = rows.len(), "Read raw articles");
    Ok(rows.into_iter().map(RawArticle::from).collect())
}

#[instrument(level = "info", skip_all, fields(path = %path.display(), count = articles.len()))]
pub async fn write_classified(path: &Path, articles: &[ClassifiedArticle]) -> Result<()> {
    write_rows(path, &CLASSIFIED_HEADER, articles.iter().map(ClassifiedArticleRow::from)).await?;
    info!("Wrote classified articles");
    Ok(())
}

/// Read classified articles. The `sentiment` column is ignored; the label is
/// derived from `sentiment_score`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_classified(path: &Path) -> Result<Vec<ClassifiedArticle>> {
    let rows: Vec<ClassifiedArticleRow> = read_rows(path).await?;
    info!(count = rows.len(), "Read classified articles");
    Ok(rows.into_iter().map(ClassifiedArticle::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::classifier::taxonomy::Lexicon;

    fn sample() -> Vec<RawArticle> {
        vec![
            RawArticle {
                url: "https://www.bankingdive.com/news/check-fraud-losses/700001/".to_string(),
                title: "Check fraud losses climb, \"again\"".to_string(),
                summary: "Banks report stolen checks, counterfeit checks".to_string(),
                publish_date: NaiveDate::from_ymd_opt(2025, 10, 17),
                body_text: Some("Line one.\nLine two with mail theft.".to_string()),
                matched_keywords: vec!["check fraud".to_string(), "counterfeit check".to_string()],
            },
            RawArticle {
                url: "https://www.bankingdive.com/news/wire-scam/700002/".to_string(),
                title: "Wire transfer fraud hits lender".to_string(),
                summary: String::new(),
                publish_date: None,
                body_text: None,
                matched_keywords: vec![],
            },
        ]
    }

    #[tokio::test]
    async fn test_raw_round_trip_keeps_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/articles.csv");
        write_raw(&path, &sample()).await.unwrap();
        let back = read_raw(&path).await.unwrap();
        assert_eq!(back, sample());
    }

    #[tokio::test]
    async fn test_raw_header_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.csv");
        write_raw(&path, &sample()).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next(),
            Some("url,title,summary,publish_date,body_text,matched_keywords")
        );
    }

    #[tokio::test]
    async fn test_empty_set_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_classified(&path, &[]).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), CLASSIFIED_HEADER.join(","));
        assert!(read_classified(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_raw(&dir.path().join("nope.csv")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Read { .. }));
    }

    #[tokio::test]
    async fn test_analyze_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("articles.csv");
        write_raw(&input, &sample()).await.unwrap();

        let lexicon = Lexicon::default();
        let classifier = Classifier::new(&lexicon);
        let mut outputs = Vec::new();
        for name in ["first.csv", "second.csv"] {
            let raw = read_raw(&input).await.unwrap();
            let out = dir.path().join(name);
            write_classified(&out, &classifier.classify_all(&raw)).await.unwrap();
            outputs.push(std::fs::read(&out).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_classified_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classified.csv");
        let lexicon = Lexicon::default();
        let classified = Classifier::new(&lexicon).classify_all(&sample());
        write_classified(&path, &classified).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.lines().next().unwrap().ends_with(
            "category,risk_level,sentiment_score,sentiment,top_keywords"
        ));

        let back = read_classified(&path).await.unwrap();
        assert_eq!(back.len(), 2);
        for (a, b) in classified.iter().zip(&back) {
            assert_eq!(a.category, b.category);
            assert_eq!(a.risk_level, b.risk_level);
            assert_eq!(a.sentiment_score, b.sentiment_score);
            assert_eq!(a.top_keywords, b.top_keywords);
            assert_eq!(a.matched_keywords, b.matched_keywords);
            assert_eq!(a.article.publish_date, b.article.publish_date);
        }
    }

    #[tokio::test]
    async fn test_none_category_reads_back_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classified.csv");
        std::fs::write(
            &path,
            "url,title,summary,publish_date,body_text,matched_keywords,category,risk_level,sentiment_score,sentiment,top_keywords\n\
             https://x.test/a/,Fed outlook,,,,,none,Unknown,0,Neutral,\n",
        )
        .unwrap();
        let back = read_classified(&path).await.unwrap();
        assert_eq!(back[0].category, None);
        assert_eq!(back[0].risk_level, RiskLevel::Unknown);
        assert_eq!(back[0].article.body_text, None);
    }
}
