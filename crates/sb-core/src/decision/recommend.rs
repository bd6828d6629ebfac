//! Filter/retain/refine recommendations.
//!
//! Static classification decides first (generic signals are filtered,
//! platform-named signals retained); everything context-dependent goes
//! through specificity, significance and sanity findings. A signal with a
//! hard sanity error is never retained.

use std::collections::BTreeMap;

use sb_common::{CmsName, SignalKey};
use sb_config::AnalysisConfig;
use serde::{Deserialize, Serialize};

use super::confidence::{
    calculate_basic_confidence, combine_confidences, confidence_from_p_value, Confidence,
};
use crate::audit::{SanityReport, Severity};
use crate::classify::{FilterRecommendation, SignalCategory, SignalClassification};
use crate::stats::{
    score_specificity, Association, CmsDistribution, HeaderCmsCorrelation,
    PlatformSpecificityScore, SignificanceTestResult, TestRecommendation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationAction {
    Retain,
    Filter,
    Refine,
}

impl std::fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationAction::Retain => write!(f, "retain"),
            RecommendationAction::Filter => write!(f, "filter"),
            RecommendationAction::Refine => write!(f, "refine"),
        }
    }
}

/// Recommendation for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub signal: SignalKey,
    pub action: RecommendationAction,
    pub confidence: Confidence,
    pub reasoning: String,
    pub category: SignalCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_cms: Option<CmsName>,
    /// P(top CMS | signal).
    pub top_probability: f64,
    pub occurrences: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<TestRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    pub warnings: usize,
    /// A hard sanity error ruled out retaining this signal.
    pub blocked_by_errors: bool,
}

/// Counts per action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub total: usize,
    pub retain: usize,
    pub filter: usize,
    pub refine: usize,
    pub blocked_by_errors: usize,
}

impl RecommendationSummary {
    pub fn from_recommendations<'a>(recs: impl IntoIterator<Item = &'a Recommendation>) -> Self {
        let mut summary = RecommendationSummary::default();
        for rec in recs {
            summary.total += 1;
            match rec.action {
                RecommendationAction::Retain => summary.retain += 1,
                RecommendationAction::Filter => summary.filter += 1,
                RecommendationAction::Refine => summary.refine += 1,
            }
            if rec.blocked_by_errors {
                summary.blocked_by_errors += 1;
            }
        }
        summary
    }
}

/// Build recommendations for every correlated signal.
///
/// A missing classification counts as custom; a missing specificity score on
/// a correlation is computed on the spot; a missing significance result is
/// treated as not tested.
pub fn generate_recommendations(
    correlations: &BTreeMap<SignalKey, HeaderCmsCorrelation>,
    distribution: &CmsDistribution,
    classifications: &BTreeMap<SignalKey, SignalClassification>,
    significance: &BTreeMap<SignalKey, SignificanceTestResult>,
    sanity: &SanityReport,
    config: &AnalysisConfig,
) -> BTreeMap<SignalKey, Recommendation> {
    correlations
        .iter()
        .map(|(signal, correlation)| {
            let classification = classifications
                .get(signal)
                .cloned()
                .unwrap_or_else(SignalClassification::custom);
            let rec = recommend_signal(
                correlation,
                distribution,
                &classification,
                significance.get(signal),
                sanity,
                config,
            );
            (signal.clone(), rec)
        })
        .collect()
}

/// Recommendation for a single signal.
pub fn recommend_signal(
    correlation: &HeaderCmsCorrelation,
    distribution: &CmsDistribution,
    classification: &SignalClassification,
    test: Option<&SignificanceTestResult>,
    sanity: &SanityReport,
    config: &AnalysisConfig,
) -> Recommendation {
    let signal = &correlation.signal;
    let rc = &config.recommendation;
    let cc = &config.confidence;

    let score: PlatformSpecificityScore = match &correlation.platform_specificity {
        Some(s) => s.clone(),
        None => score_specificity(correlation, distribution, &config.specificity),
    };
    let top = correlation.top_cms();
    let top_cms = top.map(|(cms, _)| cms.clone());
    let (top_count, top_probability) = top.map_or((0, 0.0), |(_, e)| (e.count, e.probability));
    let occurrences = correlation.overall_occurrences;
    let tested = test.filter(|t| t.was_tested());
    let p_value = tested.and_then(|t| t.p_value);

    let error_count = sanity.errors_for(signal).count();
    let warnings: Vec<Severity> = sanity.warnings_for(signal).map(|w| w.severity).collect();
    let has_high_warning = warnings.contains(&Severity::High);
    let blocked = error_count > 0;

    // Evidence confidence, shared by every path.
    let mut parts = vec![
        calculate_basic_confidence(top_probability, occurrences, correlation.total_sites, cc).value,
    ];
    if let Some(p) = p_value {
        parts.push(confidence_from_p_value(p, cc).value);
    }
    parts.push(score.score);
    let mut evidence = combine_confidences(&parts, cc);
    for severity in &warnings {
        let penalty = match severity {
            Severity::Low => rc.low_warning_penalty,
            Severity::Medium => rc.medium_warning_penalty,
            Severity::High => rc.high_warning_penalty,
        };
        evidence = evidence.scaled(penalty, cc);
    }
    if top_cms.as_ref().is_some_and(|cms| distribution.is_dominant(cms)) {
        evidence = evidence.scaled(rc.dominant_platform_penalty, cc);
    }

    let mut notes: Vec<String> = Vec::new();
    if let Some(cms) = &top_cms {
        notes.push(format!(
            "{}/{} sites ({:.0}%) sharing this signal are {}",
            top_count,
            occurrences,
            top_probability * 100.0,
            cms
        ));
    }
    notes.push(format!("specificity {:.2} via {}", score.score, score.method));
    match tested {
        Some(t) => notes.push(format!(
            "{} p = {:.3e} ({})",
            t.method,
            t.p_value.unwrap_or(1.0),
            t.recommendation
        )),
        None => notes.push("significance not tested".to_string()),
    }
    if !warnings.is_empty() {
        notes.push(format!("{} sanity warning(s)", warnings.len()));
    }

    let static_confidence = |value: f64| {
        let mut c = Confidence::new(value, cc);
        for severity in &warnings {
            if *severity == Severity::High {
                c = c.scaled(rc.high_warning_penalty, cc);
            }
        }
        c
    };

    let (action, confidence, lead) = if blocked {
        let action = if classification.category == SignalCategory::Generic {
            RecommendationAction::Filter
        } else {
            RecommendationAction::Refine
        };
        (
            action,
            evidence.scaled(rc.high_warning_penalty, cc),
            format!("{error_count} hard sanity error(s); correlation math is unreliable"),
        )
    } else if classification.filter == FilterRecommendation::AlwaysFilter {
        (
            RecommendationAction::Filter,
            static_confidence(1.0 - classification.discriminative_prior),
            format!("{} signal present across platforms", classification.category),
        )
    } else if classification.filter == FilterRecommendation::NeverFilter {
        let lead = match &classification.vendor {
            Some(vendor) => format!("signal names platform {vendor}"),
            None => "platform-named signal".to_string(),
        };
        (
            RecommendationAction::Retain,
            static_confidence(classification.discriminative_prior),
            lead,
        )
    } else {
        let test_rec = tested.map(|t| t.recommendation);
        let positive = tested.is_some_and(|t| t.association == Association::Positive);
        let action = if score.score >= rc.retain_specificity
            && test_rec == Some(TestRecommendation::Use)
            && positive
            && !has_high_warning
        {
            RecommendationAction::Retain
        } else if score.score < rc.filter_specificity
            || (score.score < rc.retain_specificity
                && matches!(test_rec, None | Some(TestRecommendation::Reject)))
        {
            RecommendationAction::Filter
        } else {
            RecommendationAction::Refine
        };
        let lead = match action {
            RecommendationAction::Retain => "discriminative and statistically significant",
            RecommendationAction::Filter if score.is_insufficient_data() => {
                "no reliable platform association (small sample)"
            }
            RecommendationAction::Filter => "not discriminative for any platform",
            RecommendationAction::Refine if has_high_warning => {
                "promising but flagged by sanity checks"
            }
            RecommendationAction::Refine => "promising but not yet conclusive",
        };
        let confidence = if action == RecommendationAction::Filter {
            filter_confidence(tested, p_value, top_probability, &score, &warnings, config)
        } else {
            evidence
        };
        (action, confidence, lead.to_string())
    };

    Recommendation {
        signal: signal.clone(),
        action,
        confidence,
        reasoning: format!("{}: {}", lead, notes.join("; ")),
        category: classification.category,
        top_cms,
        top_probability,
        occurrences,
        specificity: Some(score.score),
        significance: tested.map(|t| t.recommendation),
        p_value,
        warnings: warnings.len(),
        blocked_by_errors: blocked,
    }
}

/// Confidence that a signal does not discriminate: low specificity, a test
/// that fails to support the top platform, and enough data to trust both.
fn filter_confidence(
    tested: Option<&SignificanceTestResult>,
    p_value: Option<f64>,
    top_probability: f64,
    score: &PlatformSpecificityScore,
    warnings: &[Severity],
    config: &AnalysisConfig,
) -> Confidence {
    let cc = &config.confidence;
    let rc = &config.recommendation;
    let against_test = match (tested, p_value) {
        // A significant positive association argues for keeping the signal.
        (Some(t), Some(p)) if t.association == Association::Positive => {
            1.0 - confidence_from_p_value(p, cc).value
        }
        (Some(_), Some(p)) => confidence_from_p_value(p, cc).value,
        // Untested: no platform reached the minimum share.
        _ => 1.0 - top_probability,
    };
    let parts = [1.0 - score.score, against_test, score.adequacy_weight];
    let mut confidence = combine_confidences(&parts, cc);
    for severity in warnings {
        let penalty = match severity {
            Severity::Low => rc.low_warning_penalty,
            Severity::Medium => rc.medium_warning_penalty,
            Severity::High => rc.high_warning_penalty,
        };
        confidence = confidence.scaled(penalty, cc);
    }
    confidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::run_sanity_checks;
    use crate::decision::ConfidenceLevel;
    use crate::classify::SignalClassifier;
    use crate::stats::{correlation_from_counts, test_significance, CmsStats, RiskLevel};
    use std::collections::BTreeSet;

    fn distribution(buckets: &[(&str, u64)]) -> CmsDistribution {
        let total: u64 = buckets.iter().map(|(_, n)| n).sum();
        let platforms = buckets
            .iter()
            .map(|(name, n)| {
                let sites: BTreeSet<String> =
                    (0..*n).map(|i| format!("https://{name}-{i}.example")).collect();
                (
                    CmsName::normalize(name),
                    CmsStats {
                        count: *n,
                        percentage: 100.0 * *n as f64 / total as f64,
                        sites,
                        average_confidence: 1.0,
                    },
                )
            })
            .collect();
        CmsDistribution {
            total_sites: total,
            platforms,
            hhi: 0.0,
            concentration: 0.0,
            diversity: 1.2,
            dominant_platforms: vec![],
            concentration_risk: RiskLevel::Low,
            diversity_risk: RiskLevel::Low,
        }
    }

    fn recommend(
        name: &str,
        dist: &CmsDistribution,
        counts: &[(&str, u64)],
    ) -> Recommendation {
        let signal: SignalKey = name.parse().unwrap();
        let by_cms: BTreeMap<CmsName, u64> = counts
            .iter()
            .map(|(n, c)| (CmsName::normalize(n), *c))
            .collect();
        let config = AnalysisConfig::default();
        let corr = correlation_from_counts(signal.clone(), &by_cms, dist);
        let test = test_significance(&signal, &corr, dist, dist.total_sites, &config.significance);
        let mut correlations = BTreeMap::new();
        correlations.insert(signal.clone(), corr);
        let sanity = run_sanity_checks(&correlations, dist, &config.sanity);
        let classifications = SignalClassifier::new().classify_all(correlations.keys());
        let mut significance = BTreeMap::new();
        significance.insert(signal.clone(), test);
        generate_recommendations(&correlations, dist, &classifications, &significance, &sanity, &config)
            .remove(&signal)
            .unwrap()
    }

    #[test]
    fn discriminative_signal_is_retained() {
        let dist = distribution(&[("WordPress", 100), ("Drupal", 210), ("Joomla", 200)]);
        let rec = recommend("x-pingback", &dist, &[("WordPress", 80), ("Drupal", 6), ("Joomla", 4)]);
        assert_eq!(rec.action, RecommendationAction::Retain, "{}", rec.reasoning);
        assert!(rec.reasoning.contains("80/90 sites (89%)"));
        assert!(rec.reasoning.contains("WordPress"));
        assert_eq!(rec.significance, Some(TestRecommendation::Use));
        assert!(rec.confidence.value > 0.6);
    }

    #[test]
    fn generic_signal_is_filtered_regardless_of_statistics() {
        let dist = distribution(&[("WordPress", 100), ("Drupal", 210), ("Joomla", 200)]);
        let rec = recommend("content-type", &dist, &[("WordPress", 80), ("Drupal", 6), ("Joomla", 4)]);
        assert_eq!(rec.action, RecommendationAction::Filter);
        assert_eq!(rec.category, SignalCategory::Generic);
        assert!(rec.confidence.value >= 0.9);
    }

    #[test]
    fn platform_signal_is_retained_regardless_of_statistics() {
        let dist = distribution(&[("WordPress", 100), ("Drupal", 210), ("Joomla", 200)]);
        let rec = recommend("x-shopify-stage", &dist, &[("WordPress", 3), ("Drupal", 3), ("Joomla", 3)]);
        assert_eq!(rec.action, RecommendationAction::Retain);
        assert!(rec.reasoning.starts_with("signal names platform Shopify"));
    }

    #[test]
    fn weak_signal_is_filtered() {
        let dist = distribution(&[("Joomla", 830), ("WordPress", 2000), ("Drupal", 739), ("", 1000)]);
        let rec = recommend(
            "x-content-encoded-by",
            &dist,
            &[("Joomla", 2), ("WordPress", 13), ("Drupal", 12), ("", 10)],
        );
        assert_eq!(rec.action, RecommendationAction::Filter);
        assert!(rec.specificity.unwrap() < 0.3);
        // 37 carriers with no platform preference is a confident filter.
        assert!(rec.confidence.level >= ConfidenceLevel::Medium, "{}", rec.confidence.value);
    }

    #[test]
    fn hard_error_blocks_retain() {
        let dist = distribution(&[("WordPress", 100), ("Drupal", 210), ("Joomla", 200)]);
        let signal = SignalKey::header("x-pingback");
        let by_cms: BTreeMap<CmsName, u64> = [("WordPress", 80u64), ("Drupal", 6), ("Joomla", 4)]
            .iter()
            .map(|(n, c)| (CmsName::normalize(n), *c))
            .collect();
        let config = AnalysisConfig::default();
        let mut corr = correlation_from_counts(signal.clone(), &by_cms, &dist);
        // Break count conservation.
        corr.overall_occurrences = 95;
        let test = test_significance(&signal, &corr, &dist, dist.total_sites, &config.significance);
        let mut correlations = BTreeMap::new();
        correlations.insert(signal.clone(), corr);
        let sanity = run_sanity_checks(&correlations, &dist, &config.sanity);
        assert!(!sanity.passed);

        let mut significance = BTreeMap::new();
        significance.insert(signal.clone(), test);
        let recs = generate_recommendations(
            &correlations,
            &dist,
            &BTreeMap::new(),
            &significance,
            &sanity,
            &config,
        );
        let rec = &recs[&signal];
        assert_eq!(rec.action, RecommendationAction::Refine);
        assert!(rec.blocked_by_errors);
        assert!(rec.reasoning.contains("hard sanity error"));
    }

    #[test]
    fn summary_counts_actions() {
        let dist = distribution(&[("WordPress", 100), ("Drupal", 210), ("Joomla", 200)]);
        let recs = [
            recommend("x-pingback", &dist, &[("WordPress", 80), ("Drupal", 6), ("Joomla", 4)]),
            recommend("content-type", &dist, &[("WordPress", 100), ("Drupal", 210), ("Joomla", 200)]),
        ];
        let summary = RecommendationSummary::from_recommendations(&recs);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.retain, 1);
        assert_eq!(summary.filter, 1);
        assert_eq!(summary.refine, 0);
    }
}
