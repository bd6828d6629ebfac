//! Static signal classification.
//!
//! Assigns every signal a category, a discriminative-score prior and a
//! filter stance from built-in tables plus optional caller rules. The
//! classifier is an immutable value built once and passed to the stages that
//! need it; [`ClassificationCache`] is an owned memo in front of it.

pub mod cache;
pub mod tables;

pub use cache::ClassificationCache;

use regex::Regex;
use sb_common::{SignalKey, SignalSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use tables::*;

/// Static category of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    /// Present on nearly every site (`content-type`, `date`).
    Generic,
    /// Often reveals a CMS without naming one (`x-generator`, `x-pingback`).
    CmsIndicative,
    /// CDN, proxy or hosting artifacts.
    Infrastructure,
    /// Names a vendor/platform outright.
    Platform,
    /// Anything not in the knowledge base.
    Custom,
}

impl SignalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalCategory::Generic => "generic",
            SignalCategory::CmsIndicative => "cms_indicative",
            SignalCategory::Infrastructure => "infrastructure",
            SignalCategory::Platform => "platform",
            SignalCategory::Custom => "custom",
        }
    }
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stance the recommender takes before looking at statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRecommendation {
    AlwaysFilter,
    NeverFilter,
    ContextDependent,
}

/// Classification of one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalClassification {
    pub category: SignalCategory,
    /// Dataset-independent prior on discriminative value, in [0, 1].
    pub discriminative_prior: f64,
    pub filter: FilterRecommendation,
    /// Platform the signal names, for `Platform` signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

impl SignalClassification {
    pub fn generic() -> Self {
        Self::of(SignalCategory::Generic)
    }

    pub fn custom() -> Self {
        Self::of(SignalCategory::Custom)
    }

    pub fn platform(vendor: impl Into<String>) -> Self {
        SignalClassification {
            vendor: Some(vendor.into()),
            ..Self::of(SignalCategory::Platform)
        }
    }

    /// Default prior and stance for a category.
    pub fn of(category: SignalCategory) -> Self {
        let (discriminative_prior, filter) = match category {
            SignalCategory::Generic => (GENERIC_PRIOR, FilterRecommendation::AlwaysFilter),
            SignalCategory::Infrastructure => {
                (INFRASTRUCTURE_PRIOR, FilterRecommendation::ContextDependent)
            }
            SignalCategory::Custom => (CUSTOM_PRIOR, FilterRecommendation::ContextDependent),
            SignalCategory::CmsIndicative => {
                (CMS_INDICATIVE_PRIOR, FilterRecommendation::ContextDependent)
            }
            SignalCategory::Platform => (PLATFORM_PRIOR, FilterRecommendation::NeverFilter),
        };
        SignalClassification {
            category,
            discriminative_prior,
            filter,
            vendor: None,
        }
    }
}

/// How a caller rule matches a signal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RulePattern {
    Exact(String),
    Prefix(String),
    Regex(String),
}

/// Caller-supplied classification rule. Rules are tried in order before the
/// built-in tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Restrict the rule to one source; `None` matches all sources.
    #[serde(default)]
    pub source: Option<SignalSource>,
    pub pattern: RulePattern,
    pub classification: SignalClassification,
}

/// Errors building a classifier.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid rule pattern {pattern:?}: {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("rule prior {prior} outside [0, 1]")]
    InvalidPrior { prior: f64 },
}

#[derive(Debug, Clone)]
enum CompiledPattern {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl CompiledPattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            CompiledPattern::Exact(s) => name == s,
            CompiledPattern::Prefix(p) => name.starts_with(p.as_str()),
            CompiledPattern::Regex(re) => re.is_match(name),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    source: Option<SignalSource>,
    pattern: CompiledPattern,
    classification: SignalClassification,
}

/// Immutable signal classifier.
#[derive(Debug, Clone)]
pub struct SignalClassifier {
    rules: Vec<CompiledRule>,
    generic: HashSet<&'static str>,
    infrastructure: HashSet<&'static str>,
    cms_indicative: HashSet<&'static str>,
}

impl Default for SignalClassifier {
    fn default() -> Self {
        SignalClassifier {
            rules: Vec::new(),
            generic: GENERIC_HEADERS.iter().copied().collect(),
            infrastructure: INFRASTRUCTURE_HEADERS.iter().copied().collect(),
            cms_indicative: CMS_INDICATIVE_HEADERS.iter().copied().collect(),
        }
    }
}

impl SignalClassifier {
    /// Classifier over the built-in knowledge base only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with caller rules layered over the built-in tables.
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Result<Self, ClassifyError> {
        let mut classifier = Self::default();
        for rule in rules {
            let prior = rule.classification.discriminative_prior;
            if !(0.0..=1.0).contains(&prior) {
                return Err(ClassifyError::InvalidPrior { prior });
            }
            let pattern = match rule.pattern {
                RulePattern::Exact(s) => CompiledPattern::Exact(s.trim().to_lowercase()),
                RulePattern::Prefix(p) => CompiledPattern::Prefix(p.trim().to_lowercase()),
                RulePattern::Regex(p) => {
                    CompiledPattern::Regex(Regex::new(&p).map_err(|e| {
                        ClassifyError::InvalidPattern {
                            pattern: p.clone(),
                            error: e.to_string(),
                        }
                    })?)
                }
            };
            classifier.rules.push(CompiledRule {
                source: rule.source,
                pattern,
                classification: rule.classification,
            });
        }
        Ok(classifier)
    }

    /// Number of caller rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify one signal. Pure function of the key.
    pub fn classify(&self, key: &SignalKey) -> SignalClassification {
        let name = key.name();

        if let Some(rule) = self.rules.iter().find(|r| {
            r.source.is_none_or(|s| s == key.source()) && r.pattern.matches(name)
        }) {
            return rule.classification.clone();
        }

        if key.source() == SignalSource::Header {
            if self.generic.contains(name) {
                return SignalClassification::generic();
            }
            if self.cms_indicative.contains(name) {
                return SignalClassification::of(SignalCategory::CmsIndicative);
            }
            if self.infrastructure.contains(name)
                || INFRASTRUCTURE_PREFIXES.iter().any(|p| name.starts_with(p))
            {
                return SignalClassification::of(SignalCategory::Infrastructure);
            }
        }

        match vendor_in(name) {
            Some(vendor) => SignalClassification::platform(vendor),
            None => SignalClassification::custom(),
        }
    }

    /// Classify a set of signals.
    pub fn classify_all<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a SignalKey>,
    ) -> BTreeMap<SignalKey, SignalClassification> {
        keys.into_iter()
            .map(|k| (k.clone(), self.classify(k)))
            .collect()
    }
}

/// Platform named by a vendor token appearing as a whole name segment.
///
/// Segments are split on `-`, `_`, `.`, `/`, `:` and whitespace, so
/// `x-shopify-stage` and `cdn.shopify.com` match while `x-twix` does not.
pub fn vendor_in(name: &str) -> Option<&'static str> {
    name.split(|c: char| matches!(c, '-' | '_' | '.' | '/' | ':') || c.is_whitespace())
        .find_map(|segment| {
            let stem = segment.trim_end_matches(|c: char| c.is_ascii_digit());
            VENDOR_TOKENS
                .iter()
                .find(|(token, _)| {
                    segment.eq_ignore_ascii_case(token) || stem.eq_ignore_ascii_case(token)
                })
                .map(|(_, vendor)| *vendor)
        })
}
