//! Corpus statistics: distribution, correlations, specificity, significance.

pub mod correlation;
pub mod distribution;
pub mod significance;
pub mod specificity;

pub use correlation::{
    compute_correlations, correlation_from_counts, CmsFrequency, CmsGivenSignal,
    HeaderCmsCorrelation,
};
pub use distribution::{compute_distribution, CmsDistribution, CmsStats, RiskLevel};
pub use significance::{
    chi_square_yates, odds_ratio, recommendation_for, select_method, test_significance,
    test_table, Association, ContingencyTable, OddsRatio, SignificanceTestResult, TestMethod,
    TestRecommendation,
};
pub use specificity::{
    background_contrast, score_specificity, PlatformSpecificityScore, SampleAdequacy,
    SpecificityMethod,
};
