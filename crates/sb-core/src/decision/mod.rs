//! Confidence calibration and recommendations.

pub mod confidence;
pub mod recommend;

pub use confidence::{
    calculate_basic_confidence, combine_confidences, confidence_from_p_value, Confidence,
    ConfidenceLevel,
};
pub use recommend::{
    generate_recommendations, recommend_signal, Recommendation, RecommendationAction,
    RecommendationSummary,
};
