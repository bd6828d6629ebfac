//! Signal-bias core library.
//!
//! Decides which crawled website signals (headers, meta tags, scripts) are
//! trustworthy indicators of a CMS platform:
//! - Static signal classification with a memo cache
//! - CMS distribution, concentration and diversity
//! - Bidirectional signal/CMS correlations
//! - Platform specificity scoring and significance testing
//! - Self-auditing sanity checks
//! - Confidence calibration and filter/retain/refine recommendations
//!
//! Every stage is a pure function over an immutable [`Corpus`] snapshot;
//! [`AnalysisPipeline`] runs them in dependency order.

pub mod audit;
pub mod classify;
pub mod decision;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use audit::{run_sanity_checks, CheckKind, SanityFinding, SanityReport, Severity};
pub use classify::{
    ClassificationCache, ClassificationRule, FilterRecommendation, SignalCategory,
    SignalClassification, SignalClassifier,
};
pub use decision::{
    calculate_basic_confidence, combine_confidences, confidence_from_p_value,
    generate_recommendations, Confidence, ConfidenceLevel, Recommendation, RecommendationAction,
    RecommendationSummary,
};
pub use pipeline::{AnalysisPipeline, AnalysisReport, Analyzer, StageInputs};
pub use report::render_report;
pub use stats::{
    compute_correlations, compute_distribution, score_specificity, test_significance,
    CmsDistribution, CmsGivenSignal, CmsStats, HeaderCmsCorrelation, PlatformSpecificityScore,
    SignificanceTestResult,
};

pub use sb_common::{CmsName, Corpus, Error, Result, SignalKey, SiteRecord};
pub use sb_config::AnalysisConfig;
