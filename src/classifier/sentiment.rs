use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Fraud-context polarity lexicon: losses and enforcement read negative,
/// protective measures and recoveries read positive.
static LEXICON: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    let negative = [
        "breach", "attack", "fraud", "theft", "scam", "loss", "victim", "criminal", "illegal",
        "stolen", "compromised", "vulnerable", "fine", "penalty", "violation", "failure",
        "concern", "warning",
    ];
    let positive = [
        "prevention", "protection", "secure", "success", "improvement", "enhance", "strengthen",
        "detect", "recover", "safeguard",
    ];
    negative
        .into_iter()
        .map(|w| (w, -1))
        .chain(positive.into_iter().map(|w| (w, 1)))
        .collect()
});

/// Inflection endings folded back onto a lexicon stem ("breaches" -> "breach").
const SUFFIXES: [&str; 7] = ["es", "s", "ed", "d", "ing", "ment", "ion"];

/// Lexicon score for one token, 0 when unknown.
fn word_score(token: &str) -> i32 {
    if let Some(score) = LEXICON.get(token) {
        return *score;
    }
    SUFFIXES
        .iter()
        .filter_map(|suffix| token.strip_suffix(suffix))
        .find_map(|stem| {
            LEXICON
                .get(stem)
                .or_else(|| LEXICON.get(format!("{stem}e").as_str()))
                .copied()
        })
        .unwrap_or(0)
}

/// Signed polarity of an already tokenized text.
///
/// Each lexicon token adds its weight; a negator within the three preceding
/// tokens inverts it ("no loss", "not secure").
pub fn score_tokens(tokens: &[String]) -> i32 {
    let mut score = 0;
    for (i, token) in tokens.iter().enumerate() {
        let base = word_score(token);
        if base == 0 {
            continue;
        }
        let negated = (1..=3).any(|k| i >= k && is_negator(&tokens[i - k]));
        score += if negated { -base } else { base };
    }
    score
}

fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not" | "no" | "never" | "without" | "cannot" | "nor" | "isn" | "wasn" | "aren" | "won" | "didn"
    )
}
