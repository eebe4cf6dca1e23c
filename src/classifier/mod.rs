//! Keyword-driven fraud classification.
//!
//! [`Classifier::classify`] is a pure function of an article's text and the
//! installed [`Lexicon`]: the same article always yields the same category,
//! risk level, sentiment score, and keywords, independent of any other
//! article in the batch.
//!
//! # Submodules
//!
//! - [`taxonomy`]: Fraud categories, risk rubric, and the process-wide lexicon
//! - [`text`]: Tokenizer, phrase matching, stopwords, top-keyword ranking
//! - [`sentiment`]: Lexicon-based polarity scoring

pub mod sentiment;
pub mod taxonomy;
pub mod text;

use crate::models::{ClassifiedArticle, RawArticle};
use itertools::Itertools;
use taxonomy::{CategoryHits, Lexicon};
use tracing::{debug, instrument};

/// Number of per-article keywords kept by default.
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    lexicon: &'a Lexicon,
    top_k: usize,
}

impl<'a> Classifier<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Enrich one article with fraud keywords, category, risk, sentiment, and top keywords.
    ///
    /// Scores title, summary, and body together; an article with no body is
    /// classified from its title and summary alone.
    #[instrument(level = "debug", skip_all, fields(url = %article.url))]
    pub fn classify(&self, article: &RawArticle) -> ClassifiedArticle {
        let tokens = text::tokenize(&article.analysis_text());
        let hits = self.lexicon.taxonomy.category_hits(&tokens);

        let category = pick_category(&hits).map(str::to_string);
        let matched_keywords: Vec<String> = hits
            .iter()
            .flat_map(|h| h.keywords.iter().copied())
            .unique()
            .map(str::to_string)
            .collect();

        let risk_level = self
            .lexicon
            .rubric
            .assess(category.as_deref(), matched_keywords.len(), &tokens);
        let sentiment_score = sentiment::score_tokens(&tokens);
        let top_keywords = text::top_keywords(&tokens, self.top_k)
            .into_iter()
            .map(|(word, _)| word)
            .collect();

        debug!(
            category = category.as_deref().unwrap_or("none"),
            hits = matched_keywords.len(),
            %risk_level,
            sentiment_score,
            "Classified article"
        );

        ClassifiedArticle {
            article: article.clone(),
            matched_keywords,
            category,
            risk_level,
            sentiment_score,
            top_keywords,
        }
    }

    /// Classify a batch, preserving input order.
    pub fn classify_all(&self, articles: &[RawArticle]) -> Vec<ClassifiedArticle> {
        articles.iter().map(|a| self.classify(a)).collect()
    }
}

/// Category with the most distinct keyword hits.
///
/// `hits` arrives in taxonomy priority order, and only a strictly greater
/// count replaces the current leader, so ties go to the higher-priority
/// category. Zero hits everywhere yields `None`.
fn pick_category<'h>(hits: &[CategoryHits<'h>]) -> Option<&'h str> {
    let mut best: Option<(&str, usize)> = None;
    for h in hits {
        let n = h.keywords.len();
        if n == 0 {
            continue;
        }
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((h.category, n));
        }
    }
    best.map(|(name, _)| name)
}
