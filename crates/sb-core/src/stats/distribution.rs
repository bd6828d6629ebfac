//! CMS distribution analysis.
//!
//! Buckets every site by normalized CMS label and derives concentration
//! (normalized HHI) and diversity (Shannon index) for the corpus.

use std::collections::{BTreeMap, BTreeSet};

use sb_common::{CmsName, Corpus};
use sb_config::DistributionConfig;
use sb_math::{herfindahl_index, shannon_index};
use serde::{Deserialize, Serialize};

/// Qualitative risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// One CMS bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmsStats {
    pub count: u64,
    /// Share of the corpus in percent (0-100).
    pub percentage: f64,
    /// Site identifiers (URLs) in this bucket.
    pub sites: BTreeSet<String>,
    /// Mean detector label confidence over the bucket.
    pub average_confidence: f64,
}

/// CMS distribution of one corpus snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmsDistribution {
    pub total_sites: u64,
    pub platforms: BTreeMap<CmsName, CmsStats>,
    /// Raw Herfindahl-Hirschman index on the 0-10000 scale.
    pub hhi: f64,
    /// HHI normalized to 0-1.
    pub concentration: f64,
    /// Shannon diversity `-Σ p ln p`.
    pub diversity: f64,
    pub dominant_platforms: Vec<CmsName>,
    pub concentration_risk: RiskLevel,
    pub diversity_risk: RiskLevel,
}

impl CmsDistribution {
    /// Site count for a CMS (0 when absent).
    pub fn count(&self, cms: &CmsName) -> u64 {
        self.platforms.get(cms).map_or(0, |s| s.count)
    }

    /// Corpus share of a CMS in [0, 1].
    pub fn share(&self, cms: &CmsName) -> f64 {
        if self.total_sites == 0 {
            return 0.0;
        }
        self.count(cms) as f64 / self.total_sites as f64
    }

    pub fn is_dominant(&self, cms: &CmsName) -> bool {
        self.dominant_platforms.contains(cms)
    }

    /// Platforms ordered by count, largest first (name breaks ties).
    pub fn ranked(&self) -> Vec<(&CmsName, &CmsStats)> {
        let mut ranked: Vec<_> = self.platforms.iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// True when the corpus has at most one CMS bucket.
    pub fn is_degenerate(&self) -> bool {
        self.platforms.len() <= 1
    }
}

/// Compute the CMS distribution of a corpus.
///
/// An empty corpus yields zero diversity and maximal concentration.
pub fn compute_distribution(corpus: &Corpus, config: &DistributionConfig) -> CmsDistribution {
    let mut buckets: BTreeMap<CmsName, (BTreeSet<String>, f64)> = BTreeMap::new();
    for site in corpus {
        let entry = buckets.entry(site.cms_name()).or_default();
        entry.0.insert(site.url.clone());
        entry.1 += site.confidence;
    }

    let total_sites = corpus.len() as u64;
    let platforms: BTreeMap<CmsName, CmsStats> = buckets
        .into_iter()
        .map(|(cms, (sites, confidence_sum))| {
            let count = sites.len() as u64;
            let stats = CmsStats {
                count,
                percentage: 100.0 * count as f64 / total_sites as f64,
                average_confidence: confidence_sum / count as f64,
                sites,
            };
            (cms, stats)
        })
        .collect();

    let shares: Vec<f64> = platforms
        .values()
        .map(|s| s.count as f64 / total_sites as f64)
        .collect();

    let (concentration, diversity) = if total_sites == 0 {
        (1.0, 0.0)
    } else {
        (herfindahl_index(&shares), shannon_index(&shares).max(0.0))
    };

    let dominant_platforms = platforms
        .iter()
        .filter(|(_, s)| s.count as f64 / total_sites as f64 > config.dominance_share)
        .map(|(cms, _)| cms.clone())
        .collect();

    CmsDistribution {
        total_sites,
        hhi: concentration * 10_000.0,
        concentration,
        diversity,
        dominant_platforms,
        concentration_risk: concentration_risk(concentration, config),
        diversity_risk: diversity_risk(diversity, config),
        platforms,
    }
}

fn concentration_risk(hhi: f64, config: &DistributionConfig) -> RiskLevel {
    if hhi > config.hhi_high {
        RiskLevel::High
    } else if hhi > config.hhi_medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn diversity_risk(diversity: f64, config: &DistributionConfig) -> RiskLevel {
    if diversity < config.diversity_high_risk {
        RiskLevel::High
    } else if diversity < config.diversity_medium_risk {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_common::SiteRecord;

    fn corpus(labels: &[(&str, usize)]) -> Corpus {
        let mut sites = Vec::new();
        for (cms, n) in labels {
            for i in 0..*n {
                sites.push(SiteRecord::new(format!("https://{cms}-{i}.example"), *cms, 0.9));
            }
        }
        Corpus::new(sites).unwrap()
    }

    #[test]
    fn counts_and_percentages() {
        let dist = compute_distribution(
            &corpus(&[("WordPress", 60), ("Drupal", 30), ("", 10)]),
            &DistributionConfig::default(),
        );
        assert_eq!(dist.total_sites, 100);
        assert_eq!(dist.count(&CmsName::normalize("wordpress")), 60);
        assert_eq!(dist.count(&CmsName::unknown()), 10);
        let pct: f64 = dist.platforms.values().map(|s| s.percentage).sum();
        assert!((pct - 100.0).abs() < 1e-9);
        assert!((dist.concentration - (0.36 + 0.09 + 0.01)).abs() < 1e-12);
        assert!((dist.hhi - 4600.0).abs() < 1e-6);
        assert_eq!(dist.concentration_risk, RiskLevel::Medium);
        // 0.6 is not strictly above the dominance share.
        assert!(dist.dominant_platforms.is_empty());
        assert!((dist.platforms[&CmsName::unknown()].average_confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn dominant_platform_detected() {
        let dist = compute_distribution(
            &corpus(&[("WordPress", 70), ("Wix", 30)]),
            &DistributionConfig::default(),
        );
        assert_eq!(dist.dominant_platforms, vec![CmsName::normalize("WordPress")]);
        assert_eq!(dist.concentration_risk, RiskLevel::High);
        assert_eq!(dist.ranked()[0].1.count, 70);
    }

    #[test]
    fn empty_corpus_is_maximally_concentrated() {
        let dist = compute_distribution(&Corpus::new(vec![]).unwrap(), &DistributionConfig::default());
        assert_eq!(dist.total_sites, 0);
        assert_eq!(dist.diversity, 0.0);
        assert_eq!(dist.concentration, 1.0);
        assert_eq!(dist.concentration_risk, RiskLevel::High);
        assert_eq!(dist.diversity_risk, RiskLevel::High);
        assert_eq!(dist.share(&CmsName::unknown()), 0.0);
        assert!(dist.is_degenerate());
    }

    #[test]
    fn single_cms_corpus() {
        let dist = compute_distribution(&corpus(&[("Joomla", 5)]), &DistributionConfig::default());
        assert_eq!(dist.diversity, 0.0);
        assert_eq!(dist.concentration, 1.0);
        assert!(dist.is_degenerate());
    }

    #[test]
    fn diverse_corpus_is_low_risk() {
        let dist = compute_distribution(
            &corpus(&[("WordPress", 25), ("Drupal", 25), ("Joomla", 25), ("Wix", 25)]),
            &DistributionConfig::default(),
        );
        assert!((dist.diversity - 4f64.ln()).abs() < 1e-12);
        assert_eq!(dist.diversity_risk, RiskLevel::Low);
        assert_eq!(dist.concentration_risk, RiskLevel::Low);
    }
}
