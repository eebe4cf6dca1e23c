//! Tokenization, phrase matching, and frequency-ranked keyword extraction.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// English function words plus reporting verbs that carry no topic signal.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "also", "am", "an", "and",
    "any", "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "couldn", "did", "didn", "do", "does",
    "doesn", "doing", "don", "down", "during", "each", "few", "for", "from", "further", "had",
    "hadn", "has", "hasn", "have", "haven", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "isn", "it", "its", "itself",
    "just", "ll", "ma", "me", "mightn", "more", "most", "mustn", "my", "myself", "needn", "no",
    "nor", "not", "now", "o", "of", "off", "on", "once", "one", "only", "or", "other", "our",
    "ours", "ourselves", "out", "over", "own", "re", "s", "said", "same", "say", "says", "shan",
    "she", "should", "shouldn", "so", "some", "such", "t", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "three",
    "through", "to", "too", "two", "under", "until", "up", "ve", "very", "was", "wasn", "we",
    "were", "weren", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "won", "would", "wouldn", "y", "you", "your", "yours", "yourself", "yourselves",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

/// Shortest token length (in chars) that can be a keyword.
const MIN_KEYWORD_CHARS: usize = 4;

/// Split text into lower-case alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORD_SET.contains(token)
}

/// Whether `phrase` (already tokenized) occurs as a contiguous token run in `tokens`.
///
/// Matching on token boundaries keeps short keywords such as "aml" or "sar"
/// from firing inside unrelated words.
pub fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|w| w == phrase)
}

/// Rank content words by frequency and return the `k` most frequent.
///
/// Only alphabetic tokens of at least four characters that are not stopwords
/// are counted. Equal counts keep first-occurrence order.
pub fn top_keywords(tokens: &[String], k: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, token) in tokens.iter().enumerate() {
        if token.chars().count() < MIN_KEYWORD_CHARS
            || !token.chars().all(char::is_alphabetic)
            || is_stopword(token)
        {
            continue;
        }
        counts.entry(token.as_str()).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(word, (count, first))| (word, count, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(k)
        .map(|(word, count, _)| (word.to_string(), count))
        .collect()
}
