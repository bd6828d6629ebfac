//! CMS platform labels.
//!
//! Detector output is noisy ("Drupal 7", "joomla!", "WordPress 6.4.2"). Every
//! label is folded to a canonical [`CmsName`] before bucketing so a platform
//! never splits across several distribution entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical name of the "no detection" bucket.
pub const UNKNOWN_CMS: &str = "Unknown";

const UNKNOWN_ALIASES: &[&str] = &["", "unknown", "none", "n/a", "na", "null", "undetected"];

/// (folded label, canonical name)
const KNOWN_PLATFORMS: &[(&str, &str)] = &[
    ("wordpress", "WordPress"),
    ("drupal", "Drupal"),
    ("joomla", "Joomla"),
    ("duda", "Duda"),
    ("shopify", "Shopify"),
    ("wix", "Wix"),
    ("squarespace", "Squarespace"),
    ("magento", "Magento"),
    ("webflow", "Webflow"),
    ("ghost", "Ghost"),
    ("hubspot", "HubSpot"),
    ("typo3", "TYPO3"),
    ("bigcommerce", "BigCommerce"),
    ("prestashop", "PrestaShop"),
    ("weebly", "Weebly"),
];

/// Normalized CMS label. Ordered and hashable so it can key result maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CmsName(String);

impl CmsName {
    /// Fold a raw detector label to its canonical form.
    ///
    /// Version suffixes and trailing punctuation are dropped, known platforms
    /// get their canonical spelling, unknown aliases map to [`UNKNOWN_CMS`],
    /// and anything else keeps its trimmed original spelling.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let folded = fold(trimmed);
        if UNKNOWN_ALIASES.contains(&folded.as_str()) {
            return Self::unknown();
        }
        for (key, canonical) in KNOWN_PLATFORMS {
            if folded == *key {
                return CmsName((*canonical).to_string());
            }
        }
        CmsName(trimmed.to_string())
    }

    /// The "no detection" bucket.
    pub fn unknown() -> Self {
        CmsName(UNKNOWN_CMS.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CMS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CmsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CmsName {
    fn from(raw: &str) -> Self {
        CmsName::normalize(raw)
    }
}

/// Lowercase, strip trailing "!" and drop a trailing version token.
fn fold(label: &str) -> String {
    let lower = label.to_ascii_lowercase();
    let stripped = lower.trim_end_matches(['!', '.', ' ']);
    let mut words: Vec<&str> = stripped.split_whitespace().collect();
    if words.len() > 1 {
        if let Some(last) = words.last() {
            let is_version = last
                .trim_start_matches('v')
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.' || c == 'x');
            if is_version {
                words.pop();
            }
        }
    }
    words.join(" ").trim_end_matches('!').to_string()
}
