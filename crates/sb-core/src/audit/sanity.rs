//! Sanity checker.
//!
//! Read-only invariant checks over correlations and the distribution they
//! were built against. Nothing here repairs data: each violation becomes a
//! finding, hard errors clear the `passed` verdict, and warnings are carried
//! to the recommender.

use std::collections::{BTreeMap, BTreeSet};

use sb_common::{CmsName, SignalKey};
use sb_config::SanityConfig;
use serde::{Deserialize, Serialize};

use crate::stats::{CmsDistribution, HeaderCmsCorrelation, RiskLevel};

/// Finding severity. Hard errors are always `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Which invariant a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    SumToOne,
    Range,
    Support,
    BayesConsistency,
    CountConservation,
    Impossibility,
    DistributionPercentages,
    DistributionPartition,
    ConcentrationRisk,
    DiversityRisk,
}

impl CheckKind {
    /// Whether a violation of this check is a hard error.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            CheckKind::SumToOne
                | CheckKind::Range
                | CheckKind::CountConservation
                | CheckKind::Impossibility
                | CheckKind::DistributionPercentages
                | CheckKind::DistributionPartition
        )
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckKind::SumToOne => "sum_to_one",
            CheckKind::Range => "range",
            CheckKind::Support => "support",
            CheckKind::BayesConsistency => "bayes_consistency",
            CheckKind::CountConservation => "count_conservation",
            CheckKind::Impossibility => "impossibility",
            CheckKind::DistributionPercentages => "distribution_percentages",
            CheckKind::DistributionPartition => "distribution_partition",
            CheckKind::ConcentrationRisk => "concentration_risk",
            CheckKind::DiversityRisk => "diversity_risk",
        };
        f.write_str(s)
    }
}

/// One violated invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityFinding {
    pub check: CheckKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms: Option<CmsName>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, f64>,
}

impl SanityFinding {
    fn new(check: CheckKind, severity: Severity, message: impl Into<String>) -> Self {
        SanityFinding {
            check,
            severity,
            message: message.into(),
            signal: None,
            cms: None,
            details: BTreeMap::new(),
        }
    }

    fn hard(check: CheckKind, message: impl Into<String>) -> Self {
        Self::new(check, Severity::High, message)
    }

    fn signal(mut self, signal: &SignalKey) -> Self {
        self.signal = Some(signal.clone());
        self
    }

    fn cms(mut self, cms: &CmsName) -> Self {
        self.cms = Some(cms.clone());
        self
    }

    fn detail(mut self, key: &str, value: f64) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitySummary {
    pub signals_checked: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Signals with at least one hard error.
    pub signals_with_errors: usize,
}

/// Audit verdict for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityReport {
    pub passed: bool,
    pub warnings: Vec<SanityFinding>,
    pub errors: Vec<SanityFinding>,
    pub summary: SanitySummary,
}

impl SanityReport {
    fn from_findings(findings: Vec<SanityFinding>, signals_checked: usize) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            findings.into_iter().partition(|f| f.check.is_hard());
        let signals_with_errors = errors
            .iter()
            .filter_map(|f| f.signal.as_ref())
            .collect::<BTreeSet<_>>()
            .len();
        SanityReport {
            passed: errors.is_empty(),
            summary: SanitySummary {
                signals_checked,
                errors: errors.len(),
                warnings: warnings.len(),
                signals_with_errors,
            },
            warnings,
            errors,
        }
    }

    pub fn errors_for<'a>(&'a self, signal: &'a SignalKey) -> impl Iterator<Item = &'a SanityFinding> {
        self.errors.iter().filter(move |f| f.signal.as_ref() == Some(signal))
    }

    pub fn warnings_for<'a>(
        &'a self,
        signal: &'a SignalKey,
    ) -> impl Iterator<Item = &'a SanityFinding> {
        self.warnings
            .iter()
            .filter(move |f| f.signal.as_ref() == Some(signal))
    }

    pub fn has_errors_for(&self, signal: &SignalKey) -> bool {
        self.errors_for(signal).next().is_some()
    }

    /// Most severe warning attached to a signal.
    pub fn max_warning_severity(&self, signal: &SignalKey) -> Option<Severity> {
        self.warnings_for(signal).map(|f| f.severity).max()
    }

    /// Corpus-level findings not tied to any signal.
    pub fn global_findings(&self) -> impl Iterator<Item = &SanityFinding> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(|f| f.signal.is_none())
    }
}

/// Audit all correlations and the distribution they were built against.
pub fn run_sanity_checks(
    correlations: &BTreeMap<SignalKey, HeaderCmsCorrelation>,
    distribution: &CmsDistribution,
    config: &SanityConfig,
) -> SanityReport {
    let mut findings = audit_distribution(distribution, config);
    for correlation in correlations.values() {
        check_correlation(correlation, distribution, config, &mut findings);
    }
    SanityReport::from_findings(findings, correlations.len())
}

/// Distribution-level checks: percentages, partition, risk labels.
pub fn audit_distribution(distribution: &CmsDistribution, config: &SanityConfig) -> Vec<SanityFinding> {
    let mut findings = Vec::new();
    if distribution.total_sites == 0 {
        return findings;
    }

    let pct_sum: f64 = distribution.platforms.values().map(|s| s.percentage).sum();
    if !((pct_sum - 100.0).abs() <= config.percentage_tolerance) {
        findings.push(
            SanityFinding::hard(
                CheckKind::DistributionPercentages,
                format!("CMS percentages sum to {pct_sum:.3}%, expected 100%"),
            )
            .detail("percentage_sum", pct_sum),
        );
    }

    let count_sum: u64 = distribution.platforms.values().map(|s| s.count).sum();
    let listed: usize = distribution.platforms.values().map(|s| s.sites.len()).sum();
    let distinct: BTreeSet<&String> = distribution
        .platforms
        .values()
        .flat_map(|s| s.sites.iter())
        .collect();
    if count_sum != distribution.total_sites
        || listed as u64 != distribution.total_sites
        || distinct.len() != listed
    {
        findings.push(
            SanityFinding::hard(
                CheckKind::DistributionPartition,
                format!(
                    "CMS buckets do not partition the corpus: {} counted, {} listed, {} distinct, {} total",
                    count_sum,
                    listed,
                    distinct.len(),
                    distribution.total_sites
                ),
            )
            .detail("bucket_count_sum", count_sum as f64)
            .detail("listed_sites", listed as f64)
            .detail("distinct_sites", distinct.len() as f64)
            .detail("total_sites", distribution.total_sites as f64),
        );
    }

    if distribution.concentration_risk == RiskLevel::High {
        let mut finding = SanityFinding::new(
            CheckKind::ConcentrationRisk,
            Severity::Medium,
            format!(
                "corpus is highly concentrated (HHI {:.3}); correlations mirror the dominant platform mix",
                distribution.concentration
            ),
        )
        .detail("hhi", distribution.concentration);
        if let Some(top) = distribution.dominant_platforms.first() {
            finding = finding.cms(top);
        }
        findings.push(finding);
    }
    if distribution.diversity_risk == RiskLevel::High {
        findings.push(
            SanityFinding::new(
                CheckKind::DiversityRisk,
                Severity::Medium,
                format!("corpus has low CMS diversity (Shannon {:.3})", distribution.diversity),
            )
            .detail("shannon", distribution.diversity),
        );
    }
    findings
}

fn check_correlation(
    corr: &HeaderCmsCorrelation,
    distribution: &CmsDistribution,
    config: &SanityConfig,
    findings: &mut Vec<SanityFinding>,
) {
    let signal = &corr.signal;
    let occurrences = corr.overall_occurrences;

    // Range and impossibility first; everything else assumes sane values.
    for (cms, entry) in &corr.cms_given_header {
        if !(0.0..=1.0).contains(&entry.probability) {
            findings.push(
                SanityFinding::hard(
                    CheckKind::Range,
                    format!("P({cms} | {signal}) = {} is outside [0, 1]", entry.probability),
                )
                .signal(signal)
                .cms(cms)
                .detail("probability", entry.probability),
            );
        }
        if entry.count > occurrences {
            findings.push(
                SanityFinding::hard(
                    CheckKind::Impossibility,
                    format!(
                        "{} {cms} carriers of {signal} exceed its {} occurrences",
                        entry.count, occurrences
                    ),
                )
                .signal(signal)
                .cms(cms)
                .detail("count", entry.count as f64)
                .detail("occurrences", occurrences as f64),
            );
        }
        let cms_total = distribution.count(cms);
        if entry.count > cms_total {
            findings.push(
                SanityFinding::hard(
                    CheckKind::Impossibility,
                    format!(
                        "{} {cms} carriers of {signal} exceed the {} {cms} sites",
                        entry.count, cms_total
                    ),
                )
                .signal(signal)
                .cms(cms)
                .detail("count", entry.count as f64)
                .detail("cms_total", cms_total as f64),
            );
        }
    }
    for (cms, freq) in &corr.per_cms_frequency {
        if !(0.0..=1.0).contains(&freq.frequency) || freq.occurrences > distribution.count(cms) {
            findings.push(
                SanityFinding::hard(
                    CheckKind::Impossibility,
                    format!(
                        "P({signal} | {cms}) = {} from {} carriers of {} sites",
                        freq.frequency,
                        freq.occurrences,
                        distribution.count(cms)
                    ),
                )
                .signal(signal)
                .cms(cms)
                .detail("frequency", freq.frequency)
                .detail("occurrences", freq.occurrences as f64),
            );
        }
    }
    if !(0.0..=1.0).contains(&corr.overall_frequency) {
        findings.push(
            SanityFinding::hard(
                CheckKind::Range,
                format!("overall frequency {} of {signal} is outside [0, 1]", corr.overall_frequency),
            )
            .signal(signal)
            .detail("overall_frequency", corr.overall_frequency),
        );
    }

    let count_sum: u64 = corr.cms_given_header.values().map(|e| e.count).sum();
    if count_sum != occurrences {
        findings.push(
            SanityFinding::hard(
                CheckKind::CountConservation,
                format!("per-CMS counts of {signal} sum to {count_sum}, occurrences are {occurrences}"),
            )
            .signal(signal)
            .detail("count_sum", count_sum as f64)
            .detail("occurrences", occurrences as f64),
        );
    }

    if occurrences > 0 {
        let prob_sum: f64 = corr.cms_given_header.values().map(|e| e.probability).sum();
        if !((prob_sum - 1.0).abs() <= config.sum_tolerance) {
            findings.push(
                SanityFinding::hard(
                    CheckKind::SumToOne,
                    format!("Σ P(CMS | {signal}) = {prob_sum:.4}, expected 1"),
                )
                .signal(signal)
                .detail("probability_sum", prob_sum),
            );
        }
    }

    for (cms, entry) in &corr.cms_given_header {
        if entry.probability > config.high_correlation && entry.count < config.min_support {
            findings.push(
                SanityFinding::new(
                    CheckKind::Support,
                    Severity::Medium,
                    format!(
                        "{:.0}% of {signal} carriers are {cms} but only {} sites support it",
                        entry.probability * 100.0,
                        entry.count
                    ),
                )
                .signal(signal)
                .cms(cms)
                .detail("probability", entry.probability)
                .detail("count", entry.count as f64),
            );
        }

        if entry.count == 0 {
            continue;
        }
        // P(CMS|s)·P(s) and P(s|CMS)·P(CMS) are both estimates of P(s, CMS).
        let joint_from_given = entry.probability * corr.overall_frequency;
        let joint_from_freq = corr.frequency_for(cms) * distribution.share(cms);
        let scale = joint_from_given.max(joint_from_freq);
        let relative_error = if scale > 0.0 {
            (joint_from_given - joint_from_freq).abs() / scale
        } else {
            0.0
        };
        if !(relative_error <= config.bayes_tolerance) {
            findings.push(
                SanityFinding::new(
                    CheckKind::BayesConsistency,
                    Severity::High,
                    format!(
                        "Bayes identity for {signal} and {cms} off by {:.1}%",
                        relative_error * 100.0
                    ),
                )
                .signal(signal)
                .cms(cms)
                .detail("joint_from_cms_given_signal", joint_from_given)
                .detail("joint_from_signal_given_cms", joint_from_freq)
                .detail("relative_error", relative_error),
            );
        }
    }
}
