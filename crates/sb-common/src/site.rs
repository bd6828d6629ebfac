//! Site records and the validated corpus.
//!
//! A [`SiteRecord`] is one crawled site as handed over by the detector: its
//! URL, CMS label, label confidence and the observed headers, meta tags and
//! script signals. A [`Corpus`] is an immutable, validated collection of
//! records; every analysis runs against one corpus snapshot.

use crate::cms::CmsName;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Where a signal was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Header,
    Meta,
    Script,
}

impl SignalSource {
    pub const ALL: &'static [SignalSource] =
        &[SignalSource::Header, SignalSource::Meta, SignalSource::Script];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Header => "header",
            SignalSource::Meta => "meta",
            SignalSource::Script => "script",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "header" => Some(SignalSource::Header),
            "meta" => Some(SignalSource::Meta),
            "script" => Some(SignalSource::Script),
            _ => None,
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a signal: source plus lower-cased name.
///
/// Renders and serializes as `source:name` (`header:x-generator`). A bare
/// name parses as a header.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalKey {
    source: SignalSource,
    name: String,
}

impl SignalKey {
    pub fn new(source: SignalSource, name: &str) -> Self {
        SignalKey {
            source,
            name: name.trim().to_lowercase(),
        }
    }

    pub fn header(name: &str) -> Self {
        Self::new(SignalSource::Header, name)
    }

    pub fn meta(name: &str) -> Self {
        Self::new(SignalSource::Meta, name)
    }

    pub fn script(name: &str) -> Self {
        Self::new(SignalSource::Script, name)
    }

    pub fn source(&self) -> SignalSource {
        self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.name)
    }
}

impl FromStr for SignalKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (source, name) = match s.split_once(':') {
            Some((prefix, rest)) => match SignalSource::parse(&prefix.trim().to_ascii_lowercase()) {
                Some(source) => (source, rest),
                None => return Err(Error::InvalidSignalKey(s.to_string())),
            },
            None => (SignalSource::Header, s),
        };
        if name.trim().is_empty() {
            return Err(Error::InvalidSignalKey(s.to_string()));
        }
        Ok(SignalKey::new(source, name))
    }
}

impl TryFrom<String> for SignalKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SignalKey> for String {
    fn from(key: SignalKey) -> Self {
        key.to_string()
    }
}

/// One crawled site with its detected CMS label and observed signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Site identifier, normally the crawled URL.
    pub url: String,

    /// Raw CMS label from the detector; absent means no detection.
    #[serde(default)]
    pub cms: Option<String>,

    /// Detector confidence in the label, in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,

    /// Header name to the set of observed values.
    #[serde(default)]
    pub headers: BTreeMap<String, BTreeSet<String>>,

    /// Meta tag name to the set of observed contents.
    #[serde(default)]
    pub meta_tags: BTreeMap<String, BTreeSet<String>>,

    /// Script-derived signal name to the set of observed sources.
    #[serde(default)]
    pub scripts: BTreeMap<String, BTreeSet<String>>,
}

impl SiteRecord {
    pub fn new(url: impl Into<String>, cms: impl Into<String>, confidence: f64) -> Self {
        SiteRecord {
            url: url.into(),
            cms: Some(cms.into()),
            confidence,
            headers: BTreeMap::new(),
            meta_tags: BTreeMap::new(),
            scripts: BTreeMap::new(),
        }
    }

    /// Builder-style helper adding one header observation.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .insert(value.to_string());
        self
    }

    pub fn with_meta(mut self, name: &str, value: &str) -> Self {
        self.meta_tags
            .entry(name.to_string())
            .or_default()
            .insert(value.to_string());
        self
    }

    pub fn with_script(mut self, name: &str, src: &str) -> Self {
        self.scripts
            .entry(name.to_string())
            .or_default()
            .insert(src.to_string());
        self
    }

    /// Canonical CMS bucket for this site.
    pub fn cms_name(&self) -> CmsName {
        match &self.cms {
            Some(raw) => CmsName::normalize(raw),
            None => CmsName::unknown(),
        }
    }

    /// Distinct signal keys observed on this site.
    ///
    /// Names differing only in case collapse to one key.
    pub fn signal_keys(&self) -> BTreeSet<SignalKey> {
        let mut keys = BTreeSet::new();
        for (source, map) in [
            (SignalSource::Header, &self.headers),
            (SignalSource::Meta, &self.meta_tags),
            (SignalSource::Script, &self.scripts),
        ] {
            for name in map.keys() {
                keys.insert(SignalKey::new(source, name));
            }
        }
        keys
    }

    fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSite { index, reason };
        if self.url.trim().is_empty() {
            return Err(invalid("empty site identifier".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        for (source, map) in [
            (SignalSource::Header, &self.headers),
            (SignalSource::Meta, &self.meta_tags),
            (SignalSource::Script, &self.scripts),
        ] {
            if map.keys().any(|name| name.trim().is_empty()) {
                return Err(invalid(format!("empty {} name", source)));
            }
        }
        Ok(())
    }
}

/// Validated, immutable collection of site records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Corpus {
    sites: Vec<SiteRecord>,
}

impl Corpus {
    /// Validate and wrap site records.
    ///
    /// Fails fast on the first malformed record: empty identifier, label
    /// confidence outside `[0, 1]` (including NaN), empty signal name, or a
    /// site identifier seen twice. An empty corpus is valid.
    pub fn new(sites: Vec<SiteRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(sites.len());
        for (index, site) in sites.iter().enumerate() {
            site.validate(index)?;
            if !seen.insert(site.url.trim()) {
                return Err(Error::DuplicateSite {
                    url: site.url.clone(),
                });
            }
        }
        Ok(Corpus { sites })
    }

    /// Parse a JSON array of site records and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let sites: Vec<SiteRecord> = serde_json::from_str(json)?;
        Self::new(sites)
    }

    pub fn sites(&self) -> &[SiteRecord] {
        &self.sites
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SiteRecord> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Every distinct signal observed anywhere in the corpus.
    pub fn signal_vocabulary(&self) -> BTreeSet<SignalKey> {
        self.sites.iter().flat_map(|s| s.signal_keys()).collect()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a SiteRecord;
    type IntoIter = std::slice::Iter<'a, SiteRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_key_parsing() {
        let key: SignalKey = "header:X-Generator".parse().unwrap();
        assert_eq!(key, SignalKey::header("x-generator"));
        assert_eq!(key.to_string(), "header:x-generator");

        let bare: SignalKey = "Server".parse().unwrap();
        assert_eq!(bare.source(), SignalSource::Header);

        let meta: SignalKey = "meta:generator".parse().unwrap();
        assert_eq!(meta.source(), SignalSource::Meta);

        assert!("cookie:foo".parse::<SignalKey>().is_err());
        assert!("meta:  ".parse::<SignalKey>().is_err());
    }

    #[test]
    fn signal_key_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(SignalKey::script("wp-emoji"), 3u32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"script:wp-emoji":3}"#);
        let back: BTreeMap<SignalKey, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn case_variants_collapse() {
        let site = SiteRecord::new("https://a.example", "WordPress", 0.9)
            .with_header("X-Powered-By", "PHP")
            .with_header("x-powered-by", "PHP/8");
        assert_eq!(site.signal_keys().len(), 1);

        // Folding is Unicode-aware, not ASCII-only.
        assert_eq!(SignalKey::header("X-ÄBC"), SignalKey::header("x-äbc"));
        let key: SignalKey = "meta:ÉDITEUR".parse().unwrap();
        assert_eq!(key.to_string(), "meta:éditeur");
    }

    #[test]
    fn missing_label_is_unknown() {
        let json = r#"[{"url": "https://a.example", "headers": {"server": ["nginx"]}}]"#;
        let corpus = Corpus::from_json_str(json).unwrap();
        assert!(corpus.sites()[0].cms_name().is_unknown());
        assert_eq!(corpus.signal_vocabulary().len(), 1);
    }

    #[test]
    fn rejects_malformed_records() {
        let bad_conf = SiteRecord::new("https://a.example", "Drupal", 1.5);
        assert!(matches!(
            Corpus::new(vec![bad_conf]),
            Err(Error::InvalidSite { index: 0, .. })
        ));

        let nan_conf = SiteRecord::new("https://a.example", "Drupal", f64::NAN);
        assert!(Corpus::new(vec![nan_conf]).is_err());

        let empty_url = SiteRecord::new("  ", "Drupal", 0.5);
        assert!(Corpus::new(vec![empty_url]).is_err());

        let a = SiteRecord::new("https://a.example", "Drupal", 0.5);
        assert!(matches!(
            Corpus::new(vec![a.clone(), a]),
            Err(Error::DuplicateSite { .. })
        ));
    }

    #[test]
    fn empty_corpus_is_valid() {
        let corpus = Corpus::new(Vec::new()).unwrap();
        assert!(corpus.is_empty());
        assert!(Corpus::from_json_str("[]").unwrap().is_empty());
    }
}
