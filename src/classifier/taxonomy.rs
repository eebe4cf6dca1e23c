//! Fraud taxonomy and risk rubric.
//!
//! The [`Lexicon`] bundles the keyword taxonomy with the rubric that turns
//! matches into a [`RiskLevel`]. It is built once at startup, either from the
//! built-in defaults or from a YAML override, installed process-wide with
//! [`install`], and read-only from then on.
//!
//! # Override file
//!
//! ```yaml
//! categories:            # listed in tie-break priority order
//!   - name: Wire Fraud
//!     keywords: [wire fraud, ach fraud]
//!   - name: Embezzlement
//!     keywords: [embezzlement]
//! # or, with alphabetical priority:
//! # categories:
//! #   Wire Fraud: [wire fraud, ach fraud]
//! risk:                  # optional; omitted fields keep their defaults
//!   high: [indictment, millions]
//!   category_bias:
//!     Embezzlement: 1
//! ```

use crate::classifier::text::{contains_phrase, tokenize};
use crate::error::{PipelineError, Result};
use crate::models::{NO_CATEGORY, RiskLevel};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, instrument};

static LEXICON: OnceCell<Lexicon> = OnceCell::new();

/// Category definitions in priority order.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Check Fraud",
        &["check fraud", "forged check", "counterfeit check", "altered check", "fake check"],
    ),
    (
        "Wire Fraud",
        &["wire fraud", "wire transfer fraud", "ach fraud", "electronic transfer fraud"],
    ),
    (
        "Identity Theft",
        &[
            "identity theft",
            "synthetic identity",
            "stolen identity",
            "identity fraud",
            "account takeover",
            "impersonation",
        ],
    ),
    (
        "Credit Card Fraud",
        &[
            "credit card fraud",
            "card fraud",
            "card not present",
            "skimming",
            "card cloning",
            "compromised card",
        ],
    ),
    (
        "Cyber Crime",
        &[
            "cyber attack",
            "cyberattack",
            "hacking",
            "ransomware",
            "malware",
            "phishing",
            "data breach",
            "security breach",
            "ddos",
        ],
    ),
    (
        "Money Laundering",
        &[
            "money laundering",
            "aml",
            "anti-money laundering",
            "suspicious activity",
            "sar",
            "structuring",
            "smurfing",
            "layering",
        ],
    ),
    (
        "Embezzlement",
        &["embezzlement", "employee theft", "internal fraud", "misappropriation"],
    ),
    (
        "Regulatory Compliance",
        &[
            "compliance",
            "regulation",
            "bsa",
            "bank secrecy act",
            "kyc",
            "know your customer",
            "fincen",
            "sanctions",
            "ofac",
        ],
    ),
    (
        "Other Financial Crime",
        &["fraud", "scam", "fraudulent", "financial crime", "deepfake"],
    ),
];

const DEFAULT_HIGH: &[&str] = &[
    "major breach",
    "significant loss",
    "millions",
    "billions",
    "widespread",
    "severe",
    "massive",
    "systemic",
    "enforcement action",
    "criminal charges",
    "indictment",
    "prosecution",
    "fine",
    "penalty",
];

const DEFAULT_MEDIUM: &[&str] = &[
    "warning",
    "alert",
    "concern",
    "investigation",
    "suspected",
    "potential",
    "vulnerability",
    "thousands",
    "settlement",
    "critical",
];

const DEFAULT_LOW: &[&str] = &[
    "prevention",
    "protection",
    "security measure",
    "update",
    "patch",
    "awareness",
    "training",
    "advisory",
    "guidance",
    "best practice",
];

const DEFAULT_STRONG_HITS: usize = 3;

/// A keyword phrase and its token form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub phrase: String,
    tokens: Vec<String>,
}

impl Keyword {
    fn new(phrase: &str) -> Option<Self> {
        let tokens = tokenize(phrase);
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            phrase: tokens.join(" "),
            tokens,
        })
    }

    pub fn matches(&self, tokens: &[String]) -> bool {
        contains_phrase(tokens, &self.tokens)
    }
}

fn compile(phrases: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<Keyword> {
    let mut seen = HashSet::new();
    phrases
        .into_iter()
        .filter_map(|p| Keyword::new(p.as_ref()))
        .filter(|k| seen.insert(k.phrase.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudCategory {
    pub name: String,
    pub keywords: Vec<Keyword>,
}

/// Keyword hits for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryHits<'a> {
    pub category: &'a str,
    /// Distinct matched phrases, in taxonomy order.
    pub keywords: Vec<&'a str>,
}

/// Ordered mapping from category name to keyword phrases.
///
/// Vector position is the tie-break priority: when two categories match the
/// same number of keywords, the earlier one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudTaxonomy {
    categories: Vec<FraudCategory>,
}

impl FraudTaxonomy {
    /// Build from `(name, keywords)` pairs, keeping the given priority order.
    pub fn new<N, K, P>(categories: impl IntoIterator<Item = (N, K)>) -> Result<Self>
    where
        N: Into<String>,
        K: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut names = HashSet::new();
        let mut compiled = Vec::new();
        for (name, keywords) in categories {
            let name: String = name.into();
            let name = name.trim().to_string();
            if name.is_empty() || name.eq_ignore_ascii_case(NO_CATEGORY) {
                return Err(PipelineError::Config(format!(
                    "invalid fraud category name {name:?}"
                )));
            }
            if !names.insert(name.clone()) {
                return Err(PipelineError::Config(format!("duplicate fraud category {name:?}")));
            }
            let keywords = compile(keywords);
            if keywords.is_empty() {
                return Err(PipelineError::Config(format!(
                    "fraud category {name:?} has no usable keywords"
                )));
            }
            compiled.push(FraudCategory { name, keywords });
        }
        if compiled.is_empty() {
            return Err(PipelineError::Config("fraud taxonomy is empty".to_string()));
        }
        Ok(Self { categories: compiled })
    }

    /// Build from an unordered map; priority falls back to alphabetical order.
    pub fn from_map<K, P>(map: BTreeMap<String, K>) -> Result<Self>
    where
        K: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::new(map)
    }

    pub fn categories(&self) -> &[FraudCategory] {
        &self.categories
    }

    /// Hits per category, in priority order, including categories with no hits.
    pub fn category_hits(&self, tokens: &[String]) -> Vec<CategoryHits<'_>> {
        self.categories
            .iter()
            .map(|c| CategoryHits {
                category: c.name.as_str(),
                keywords: c
                    .keywords
                    .iter()
                    .filter(|k| k.matches(tokens))
                    .map(|k| k.phrase.as_str())
                    .collect(),
            })
            .collect()
    }

    /// Distinct phrases from any category found in `text`, in taxonomy order.
    ///
    /// This is the cheap relevance test run on listing titles and summaries
    /// before an article page is fetched.
    pub fn matched_keywords(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text);
        let mut seen = HashSet::new();
        self.category_hits(&tokens)
            .into_iter()
            .flat_map(|h| h.keywords)
            .filter(|k| seen.insert(*k))
            .map(str::to_string)
            .collect()
    }
}

impl Default for FraudTaxonomy {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().map(|(n, k)| (*n, k.iter().copied())))
            .expect("built-in taxonomy is valid")
    }
}

/// Maps a category and its keyword-hit strength to a [`RiskLevel`].
///
/// The lookup only looks at the article's own text, never at other articles:
/// 1. Severity indicators: 2+ high hits is `High`; 1 high or 3+ medium is
///    `Medium-High`; 1+ medium is `Medium`; otherwise `Low`.
/// 2. `strong_hits` or more distinct fraud keywords raise the level one step.
/// 3. The category bias shifts the result by that many steps.
///
/// Results saturate within `Low..=High`. Articles without a category are `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskRubric {
    high: Vec<Keyword>,
    medium: Vec<Keyword>,
    low: Vec<Keyword>,
    category_bias: BTreeMap<String, i8>,
    strong_hits: usize,
}

impl Default for RiskRubric {
    fn default() -> Self {
        Self {
            high: compile(DEFAULT_HIGH),
            medium: compile(DEFAULT_MEDIUM),
            low: compile(DEFAULT_LOW),
            category_bias: BTreeMap::new(),
            strong_hits: DEFAULT_STRONG_HITS,
        }
    }
}

impl RiskRubric {
    /// Risk for an article of `category` with `distinct_hits` matched fraud keywords.
    pub fn assess(&self, category: Option<&str>, distinct_hits: usize, tokens: &[String]) -> RiskLevel {
        let Some(category) = category else {
            return RiskLevel::Unknown;
        };

        let count = |list: &[Keyword]| list.iter().filter(|k| k.matches(tokens)).count();
        let (high, medium, low) = (count(&self.high), count(&self.medium), count(&self.low));

        let base = if high >= 2 {
            RiskLevel::High
        } else if high >= 1 || medium >= 3 {
            RiskLevel::MediumHigh
        } else if medium >= 1 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        tracing::trace!(category, high, medium, low, ?base, "Risk indicators");

        let strength = if distinct_hits >= self.strong_hits { 1 } else { 0 };
        let bias = self.category_bias.get(category).copied().unwrap_or(0);
        base.shifted(strength).shifted(bias)
    }
}

/// Taxonomy and rubric used for one process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    pub taxonomy: FraudTaxonomy,
    pub rubric: RiskRubric,
}

#[derive(Debug, Deserialize)]
struct CategorySpec {
    name: String,
    keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RubricSpec {
    high: Option<Vec<String>>,
    medium: Option<Vec<String>>,
    low: Option<Vec<String>>,
    category_bias: BTreeMap<String, i8>,
    strong_hits: Option<usize>,
}

/// Either an ordered list (priority as written) or a plain map (alphabetical).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoriesSpec {
    Ordered(Vec<CategorySpec>),
    Map(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LexiconFile {
    categories: Option<CategoriesSpec>,
    risk: RubricSpec,
}

impl Lexicon {
    /// Parse a YAML override; omitted sections keep the built-in defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: LexiconFile = serde_yaml::from_str(yaml)?;

        let taxonomy = match file.categories {
            Some(CategoriesSpec::Ordered(specs)) => {
                FraudTaxonomy::new(specs.into_iter().map(|c| (c.name, c.keywords)))?
            }
            Some(CategoriesSpec::Map(map)) => FraudTaxonomy::from_map(map)?,
            None => FraudTaxonomy::default(),
        };

        let defaults = RiskRubric::default();
        let risk = file.risk;
        for name in risk.category_bias.keys() {
            if !taxonomy.categories().iter().any(|c| &c.name == name) {
                return Err(PipelineError::Config(format!(
                    "risk bias names unknown category {name:?}"
                )));
            }
        }
        let rubric = RiskRubric {
            high: risk.high.map(compile).unwrap_or(defaults.high),
            medium: risk.medium.map(compile).unwrap_or(defaults.medium),
            low: risk.low.map(compile).unwrap_or(defaults.low),
            category_bias: risk.category_bias,
            strong_hits: risk.strong_hits.unwrap_or(defaults.strong_hits).max(1),
        };

        Ok(Self { taxonomy, rubric })
    }

    /// Load a YAML override from disk.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let lexicon = Self::from_yaml(&raw)?;
        info!(
            categories = lexicon.taxonomy.categories().len(),
            "Loaded custom fraud taxonomy"
        );
        Ok(lexicon)
    }
}

/// Install the process-wide lexicon. Only the first call has an effect.
///
/// Returns the installed lexicon, which may be an earlier one.
pub fn install(lexicon: Lexicon) -> &'static Lexicon {
    let installed = LEXICON.get_or_init(|| lexicon);
    info!(
        categories = installed.taxonomy.categories().len(),
        "Fraud lexicon installed"
    );
    installed
}


#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn test_default_taxonomy_priority_order() {
        let taxonomy = FraudTaxonomy::default();
        let names: Vec<&str> = taxonomy.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"Check Fraud"));
        assert_eq!(names.last(), Some(&"Other Financial Crime"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_from_map_is_alphabetical() {
        let mut map = BTreeMap::new();
        map.insert("wire fraud".to_string(), vec!["wire fraud"]);
        map.insert("embezzlement".to_string(), vec!["embezzlement"]);
        let taxonomy = FraudTaxonomy::from_map(map).unwrap();
        let names: Vec<&str> = taxonomy.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["embezzlement", "wire fraud"]);
    }

    #[test]
    fn test_rejects_invalid_categories() {
        assert!(FraudTaxonomy::new(vec![("none", vec!["fraud"])]).is_err());
        assert!(FraudTaxonomy::new(vec![("Empty", Vec::<&str>::new())]).is_err());
        assert!(FraudTaxonomy::new(vec![("A", vec!["x"]), ("A", vec!["y"])]).is_err());
        assert!(FraudTaxonomy::new(Vec::<(&str, Vec<&str>)>::new()).is_err());
    }

    #[test]
    fn test_matched_keywords_dedupes_across_categories() {
        let taxonomy = FraudTaxonomy::new(vec![
            ("A", vec!["wire fraud", "fraud"]),
            ("B", vec!["fraud", "scam"]),
        ])
        .unwrap();
        assert_eq!(
            taxonomy.matched_keywords("Wire fraud scam hits depositors"),
            vec!["wire fraud", "fraud", "scam"]
        );
        assert!(taxonomy.matched_keywords("Fed holds rates").is_empty());
    }

    #[test]
    fn test_rubric_ladder() {
        let rubric = RiskRubric::default();
        let cat = Some("Wire Fraud");
        assert_eq!(rubric.assess(None, 4, &toks("millions indictment")), RiskLevel::Unknown);
        assert_eq!(
            rubric.assess(cat, 1, &toks("an indictment for millions stolen")),
            RiskLevel::High
        );
        assert_eq!(rubric.assess(cat, 1, &toks("a criminal charges filing")), RiskLevel::MediumHigh);
        assert_eq!(
            rubric.assess(cat, 1, &toks("warning alert under investigation")),
            RiskLevel::MediumHigh
        );
        assert_eq!(rubric.assess(cat, 1, &toks("an investigation opened")), RiskLevel::Medium);
        assert_eq!(rubric.assess(cat, 1, &toks("fraud awareness training")), RiskLevel::Low);
        assert_eq!(rubric.assess(cat, 1, &toks("nothing notable")), RiskLevel::Low);
    }

    #[test]
    fn test_rubric_strength_and_bias() {
        let rubric = RiskRubric::default();
        let text = toks("an investigation opened");
        assert_eq!(rubric.assess(Some("X"), 3, &text), RiskLevel::MediumHigh);

        let mut bias = BTreeMap::new();
        bias.insert("Money Laundering".to_string(), 1);
        bias.insert("Regulatory Compliance".to_string(), -1);
        let rubric = RiskRubric {
            category_bias: bias,
            ..RiskRubric::default()
        };
        assert_eq!(rubric.assess(Some("Money Laundering"), 1, &text), RiskLevel::MediumHigh);
        assert_eq!(rubric.assess(Some("Regulatory Compliance"), 1, &text), RiskLevel::Low);
        assert_eq!(rubric.assess(Some("Regulatory Compliance"), 1, &toks("quiet")), RiskLevel::Low);
    }

    #[test]
    fn test_lexicon_from_yaml_override() {
        let yaml = r#"
categories:
  - name: Wire Fraud
    keywords: [wire fraud]
  - name: Embezzlement
    keywords: [embezzlement]
risk:
  high: [indictment]
  category_bias:
    Embezzlement: 1
"#;
        let lexicon = Lexicon::from_yaml(yaml).unwrap();
        let names: Vec<&str> = lexicon
            .taxonomy
            .categories()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Wire Fraud", "Embezzlement"]);
        assert_eq!(
            lexicon.rubric.assess(Some("Wire Fraud"), 1, &toks("millions lost")),
            RiskLevel::Low
        );
        assert_eq!(
            lexicon.rubric.assess(Some("Embezzlement"), 1, &toks("quiet")),
            RiskLevel::Medium
        );
    }

    #[test]
    fn test_lexicon_yaml_category_map_is_alphabetical() {
        let yaml = "categories:\n  wire fraud: [wire fraud]\n  embezzlement: [embezzlement]\n";
        let lexicon = Lexicon::from_yaml(yaml).unwrap();
        let names: Vec<&str> = lexicon
            .taxonomy
            .categories()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["embezzlement", "wire fraud"]);
    }

    #[test]
    fn test_lexicon_yaml_defaults_when_sections_missing() {
        let lexicon = Lexicon::from_yaml("{}").unwrap();
        assert_eq!(lexicon, Lexicon::default());
    }

    #[test]
    fn test_lexicon_yaml_rejects_unknown_bias() {
        let yaml = "risk:\n  category_bias:\n    Nope: 1\n";
        assert!(matches!(Lexicon::from_yaml(yaml), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_lexicon_load_missing_file() {
        let err = Lexicon::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, PipelineError::Read { .. }));
    }
}
