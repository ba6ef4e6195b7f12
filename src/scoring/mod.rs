pub mod engine;
pub mod evaluator;
pub mod recommendation;
pub mod thresholds;
pub mod validation;
pub mod weights;

pub use engine::{
    aggregate_overall, calculate_scores, score_category, ActiveConfig, CategoryScore,
    ConfigSource, ScoreMap, ScoreReport,
};
pub use evaluator::{evaluate_parameter, DefaultReason, ParameterResult};
pub use recommendation::{Recommendation, RecommendationBands};
pub use thresholds::{
    Classification, Classify, Comparator, CountBand, CountRule, LabelRule, ParameterDefinition,
    RangeBand, RangeRule, Status, ThresholdCatalog, ThresholdRule,
};
pub use validation::{validate_profile, validate_thresholds, validate_weights};
pub use weights::{preset, resolve_weights, ActiveSelection, CategoryId, LoanType, Weights};
