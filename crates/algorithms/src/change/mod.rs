//! Change analysis between two acquisitions
//!
//! - **impact**: weighted percent change of the index means, scored 0-100
//!   with a category label and a confidence value

pub mod impact;

pub use impact::{
    analyze_impact, confidence, percent_change, CategoryThresholds, ConfidenceParams,
    ImpactAnalysis, ImpactCategory, ImpactParams, ImpactReport, ImpactWeights, NEUTRAL_SCORE,
    SCORE_RANGE, TRACKED_INDICES,
};
