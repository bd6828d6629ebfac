//! Signal/CMS correlations in both conditional directions.
//!
//! `per_cms_frequency[c]` is P(signal | CMS = c): how common the signal is
//! within a platform. `cms_given_header[c]` is P(CMS = c | signal): how likely
//! a platform is once the signal is seen. Only the second measures
//! discriminative power; both are kept because they answer different
//! questions and the sanity checker cross-checks them through Bayes' rule.

use std::collections::{BTreeMap, HashMap};

use sb_common::{CmsName, Corpus, SignalKey};
use sb_config::CorrelationConfig;
use serde::{Deserialize, Serialize};

use super::distribution::CmsDistribution;
use super::specificity::PlatformSpecificityScore;

/// P(signal | CMS) with its supporting count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmsFrequency {
    pub frequency: f64,
    pub occurrences: u64,
}

/// P(CMS | signal) with its supporting count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmsGivenSignal {
    pub probability: f64,
    pub count: u64,
}

/// Correlation of one signal with every CMS in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCmsCorrelation {
    pub signal: SignalKey,
    /// Fraction of all sites carrying the signal.
    pub overall_frequency: f64,
    pub overall_occurrences: u64,
    pub total_sites: u64,
    /// P(signal | CMS) for every CMS bucket of the distribution.
    pub per_cms_frequency: BTreeMap<CmsName, CmsFrequency>,
    /// P(CMS | signal) for every CMS with at least one carrier.
    pub cms_given_header: BTreeMap<CmsName, CmsGivenSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_specificity: Option<PlatformSpecificityScore>,
}

impl HeaderCmsCorrelation {
    /// CMS with the highest P(CMS | signal). Ties go to the larger count,
    /// then to the name that sorts first.
    pub fn top_cms(&self) -> Option<(&CmsName, &CmsGivenSignal)> {
        let mut best: Option<(&CmsName, &CmsGivenSignal)> = None;
        for (cms, entry) in &self.cms_given_header {
            let better = match best {
                None => true,
                Some((_, b)) => {
                    entry.probability > b.probability
                        || (entry.probability == b.probability && entry.count > b.count)
                }
            };
            if better {
                best = Some((cms, entry));
            }
        }
        best
    }

    /// Second-highest P(CMS | signal), 0 when only one CMS carries the signal.
    pub fn runner_up_probability(&self) -> f64 {
        let top = self.top_cms().map(|(cms, _)| cms);
        self.cms_given_header
            .iter()
            .filter(|(cms, _)| Some(*cms) != top)
            .map(|(_, e)| e.probability)
            .fold(0.0, f64::max)
    }

    pub fn probability_for(&self, cms: &CmsName) -> f64 {
        self.cms_given_header.get(cms).map_or(0.0, |e| e.probability)
    }

    pub fn count_for(&self, cms: &CmsName) -> u64 {
        self.cms_given_header.get(cms).map_or(0, |e| e.count)
    }

    pub fn frequency_for(&self, cms: &CmsName) -> f64 {
        self.per_cms_frequency.get(cms).map_or(0.0, |f| f.frequency)
    }

    /// Attach a specificity score.
    pub fn with_specificity(mut self, score: PlatformSpecificityScore) -> Self {
        self.platform_specificity = Some(score);
        self
    }

    pub fn specificity_score(&self) -> Option<f64> {
        self.platform_specificity.as_ref().map(|s| s.score)
    }
}

/// Build correlations for every signal seen in the corpus.
///
/// Counts are taken against the frozen `distribution`, which must be the
/// distribution of the same corpus. Signals with fewer than
/// `min_occurrences` carriers (and never fewer than one) get no entry.
pub fn compute_correlations(
    corpus: &Corpus,
    distribution: &CmsDistribution,
    config: &CorrelationConfig,
) -> BTreeMap<SignalKey, HeaderCmsCorrelation> {
    let mut counts: HashMap<SignalKey, BTreeMap<CmsName, u64>> = HashMap::new();
    for site in corpus {
        let cms = site.cms_name();
        for key in site.signal_keys() {
            *counts.entry(key).or_default().entry(cms.clone()).or_insert(0) += 1;
        }
    }

    let min_occurrences = config.min_occurrences.max(1);
    counts
        .into_iter()
        .filter_map(|(signal, by_cms)| {
            let occurrences: u64 = by_cms.values().sum();
            if occurrences < min_occurrences {
                return None;
            }
            Some((signal.clone(), build(signal, &by_cms, occurrences, distribution)))
        })
        .collect()
}

/// Correlation for one signal from its per-CMS carrier counts.
pub fn correlation_from_counts(
    signal: SignalKey,
    by_cms: &BTreeMap<CmsName, u64>,
    distribution: &CmsDistribution,
) -> HeaderCmsCorrelation {
    let occurrences = by_cms.values().sum();
    build(signal, by_cms, occurrences, distribution)
}

fn build(
    signal: SignalKey,
    by_cms: &BTreeMap<CmsName, u64>,
    occurrences: u64,
    distribution: &CmsDistribution,
) -> HeaderCmsCorrelation {
    let total_sites = distribution.total_sites;

    let per_cms_frequency = distribution
        .platforms
        .iter()
        .map(|(cms, stats)| {
            let carriers = by_cms.get(cms).copied().unwrap_or(0);
            let frequency = if stats.count == 0 {
                0.0
            } else {
                carriers as f64 / stats.count as f64
            };
            (
                cms.clone(),
                CmsFrequency {
                    frequency,
                    occurrences: carriers,
                },
            )
        })
        .collect();

    let cms_given_header = by_cms
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(cms, count)| {
            (
                cms.clone(),
                CmsGivenSignal {
                    probability: *count as f64 / occurrences as f64,
                    count: *count,
                },
            )
        })
        .collect();

    HeaderCmsCorrelation {
        signal,
        overall_frequency: if total_sites == 0 {
            0.0
        } else {
            occurrences as f64 / total_sites as f64
        },
        overall_occurrences: occurrences,
        total_sites,
        per_cms_frequency,
        cms_given_header,
        platform_specificity: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::distribution::compute_distribution;
    use sb_common::SiteRecord;
    use sb_config::DistributionConfig;

    fn site(i: usize, cms: &str, headers: &[&str]) -> SiteRecord {
        headers.iter().fold(
            SiteRecord::new(format!("https://s{i}.example"), cms, 1.0),
            |s, h| s.with_header(h, "1"),
        )
    }

    fn fixture() -> Corpus {
        let mut sites = Vec::new();
        let mut i = 0;
        for _ in 0..8 {
            sites.push(site(i, "WordPress", &["x-pingback", "content-type"]));
            i += 1;
        }
        for _ in 0..2 {
            sites.push(site(i, "WordPress", &["content-type"]));
            i += 1;
        }
        for _ in 0..2 {
            sites.push(site(i, "Drupal", &["x-pingback", "content-type"]));
            i += 1;
        }
        for _ in 0..8 {
            sites.push(site(i, "Drupal", &["content-type", "X-Drupal-Cache"]));
            i += 1;
        }
        Corpus::new(sites).unwrap()
    }

    #[test]
    fn both_directions_are_distinct() {
        let corpus = fixture();
        let dist = compute_distribution(&corpus, &DistributionConfig::default());
        let corr = compute_correlations(&corpus, &dist, &CorrelationConfig::default());
        let pingback = &corr[&SignalKey::header("x-pingback")];
        let wp = CmsName::normalize("WordPress");
        let drupal = CmsName::normalize("Drupal");

        assert_eq!(pingback.overall_occurrences, 10);
        assert!((pingback.overall_frequency - 0.5).abs() < 1e-12);
        // P(signal | WordPress) = 8/10, P(WordPress | signal) = 8/10.
        assert!((pingback.frequency_for(&wp) - 0.8).abs() < 1e-12);
        assert!((pingback.probability_for(&wp) - 0.8).abs() < 1e-12);
        // P(signal | Drupal) = 2/10, P(Drupal | signal) = 2/10.
        assert!((pingback.frequency_for(&drupal) - 0.2).abs() < 1e-12);
        assert_eq!(pingback.count_for(&drupal), 2);
        assert_eq!(pingback.top_cms().unwrap().0, &wp);
        assert!((pingback.runner_up_probability() - 0.2).abs() < 1e-12);

        let ct = &corr[&SignalKey::header("content-type")];
        assert!((ct.frequency_for(&wp) - 1.0).abs() < 1e-12);
        assert!((ct.probability_for(&wp) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn absent_cms_has_zero_frequency_and_no_given_entry() {
        let corpus = fixture();
        let dist = compute_distribution(&corpus, &DistributionConfig::default());
        let corr = compute_correlations(&corpus, &dist, &CorrelationConfig::default());
        let cache = &corr[&SignalKey::header("x-drupal-cache")];
        let wp = CmsName::normalize("WordPress");
        assert_eq!(cache.frequency_for(&wp), 0.0);
        assert!(!cache.cms_given_header.contains_key(&wp));
        assert_eq!(cache.per_cms_frequency.len(), 2);
        assert_eq!(cache.runner_up_probability(), 0.0);
    }

    #[test]
    fn min_occurrences_filters_rare_signals() {
        let corpus = fixture();
        let dist = compute_distribution(&corpus, &DistributionConfig::default());
        let corr = compute_correlations(&corpus, &dist, &CorrelationConfig { min_occurrences: 11 });
        assert_eq!(corr.len(), 1);
        assert!(corr.contains_key(&SignalKey::header("content-type")));
    }

    #[test]
    fn empty_corpus_has_no_correlations() {
        let corpus = Corpus::new(vec![]).unwrap();
        let dist = compute_distribution(&corpus, &DistributionConfig::default());
        assert!(compute_correlations(&corpus, &dist, &CorrelationConfig::default()).is_empty());
    }
}
