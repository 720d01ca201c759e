//! Before/after impact scoring
//!
//! Compares two metric summaries of the same scene:
//!
//! - percent change of the NDVI, EVI, FVC and LAI means,
//! - a weighted sum of those changes mapped onto a 0-100 score centred on 50,
//! - a category label from fixed score bands,
//! - a confidence value penalized by how much the per-index spread moved.
//!
//! Pure arithmetic over the two summaries; no raster data is involved.

use std::fmt;

use serde::{Deserialize, Serialize};
use verileaf_core::{Algorithm, Error, Result};

use crate::imagery::{ValueRange, VegetationIndex, DEFAULT_EPSILON};
use crate::statistics::MetricsSummary;

/// Score reported when nothing changed
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Bounds of the impact score
pub const SCORE_RANGE: ValueRange = ValueRange::new(0.0, 100.0);

/// Indices whose change feeds the score and the confidence, in report order
pub const TRACKED_INDICES: [VegetationIndex; 4] = [
    VegetationIndex::Ndvi,
    VegetationIndex::Evi,
    VegetationIndex::Fvc,
    VegetationIndex::Lai,
];

/// Weights of the per-index percent changes; they sum to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactWeights {
    pub ndvi: f64,
    pub evi: f64,
    pub fvc: f64,
    pub lai: f64,
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            ndvi: 0.4,
            evi: 0.2,
            fvc: 0.2,
            lai: 0.2,
        }
    }
}

impl ImpactWeights {
    fn as_array(&self) -> [f64; 4] {
        [self.ndvi, self.evi, self.fvc, self.lai]
    }
}

/// Lower edges of the category bands, highest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
    pub poor: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            excellent: 80.0,
            good: 65.0,
            moderate: 50.0,
            poor: 35.0,
        }
    }
}

/// Confidence heuristic: `base - penalty * sum(|std change|)`, clamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceParams {
    pub base: f64,
    pub std_penalty: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            base: 70.0,
            std_penalty: 5.0,
            min: 50.0,
            max: 95.0,
        }
    }
}

/// Parameters of the impact analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactParams {
    /// Stabilizer added to `|before|` in the percent change denominator
    pub epsilon: f64,
    pub weights: ImpactWeights,
    pub neutral_score: f64,
    /// Multiplier applied to the weighted change before it is added to the neutral score
    pub weighted_scale: f64,
    pub score_range: ValueRange,
    pub thresholds: CategoryThresholds,
    pub confidence: ConfidenceParams,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            weights: ImpactWeights::default(),
            neutral_score: NEUTRAL_SCORE,
            weighted_scale: 0.5,
            score_range: SCORE_RANGE,
            thresholds: CategoryThresholds::default(),
            confidence: ConfidenceParams::default(),
        }
    }
}

impl ImpactParams {
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            ("epsilon", self.epsilon),
            ("weights.ndvi", self.weights.ndvi),
            ("weights.evi", self.weights.evi),
            ("weights.fvc", self.weights.fvc),
            ("weights.lai", self.weights.lai),
            ("neutral_score", self.neutral_score),
            ("weighted_scale", self.weighted_scale),
            ("confidence.base", self.confidence.base),
            ("confidence.std_penalty", self.confidence.std_penalty),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(invalid(name, value, "must be finite"));
            }
        }
        if self.epsilon < 0.0 {
            return Err(invalid("epsilon", self.epsilon, "must be >= 0"));
        }
        if !(self.score_range.min.is_finite() && self.score_range.max.is_finite())
            || self.score_range.min > self.score_range.max
        {
            return Err(invalid("score_range", self.score_range.min, "min must be <= max"));
        }
        if !(self.confidence.min.is_finite() && self.confidence.max.is_finite())
            || self.confidence.min > self.confidence.max
        {
            return Err(invalid("confidence.min", self.confidence.min, "min must be <= max"));
        }
        let t = &self.thresholds;
        if !(t.excellent >= t.good && t.good >= t.moderate && t.moderate >= t.poor) {
            return Err(invalid(
                "thresholds",
                t.excellent,
                "bands must be ordered excellent >= good >= moderate >= poor",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: f64, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Ordered impact labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImpactCategory {
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Poor,
    Moderate,
    Good,
    Excellent,
}

impl ImpactCategory {
    /// First band whose lower edge the score reaches, checked high to low
    pub fn from_score(score: f64, thresholds: &CategoryThresholds) -> Self {
        if score >= thresholds.excellent {
            ImpactCategory::Excellent
        } else if score >= thresholds.good {
            ImpactCategory::Good
        } else if score >= thresholds.moderate {
            ImpactCategory::Moderate
        } else if score >= thresholds.poor {
            ImpactCategory::Poor
        } else {
            ImpactCategory::VeryPoor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImpactCategory::Excellent => "Excellent",
            ImpactCategory::Good => "Good",
            ImpactCategory::Moderate => "Moderate",
            ImpactCategory::Poor => "Poor",
            ImpactCategory::VeryPoor => "Very Poor",
        }
    }
}

impl fmt::Display for ImpactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of comparing a before and an after summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub impact_score: f64,
    pub confidence: f64,
    pub category: ImpactCategory,
    pub ndvi_change_percent: f64,
    pub evi_change_percent: f64,
    pub fvc_change_percent: f64,
    pub lai_change_percent: f64,
    pub weighted_score: f64,
}

/// `(after - before) / (|before| + epsilon) * 100`
pub fn percent_change(before: f64, after: f64, epsilon: f64) -> f64 {
    (after - before) / (before.abs() + epsilon) * 100.0
}

/// Confidence in the comparison given the spread of both summaries
pub fn confidence(before: &MetricsSummary, after: &MetricsSummary, params: &ConfidenceParams) -> f64 {
    let noise: f64 = TRACKED_INDICES
        .iter()
        .map(|&index| (before.get(index).std - after.get(index).std).abs())
        .sum();
    ValueRange::new(params.min, params.max).clamp(params.base - noise * params.std_penalty)
}

/// Score, categorize and weigh the change between two summaries
pub fn analyze_impact(
    before: &MetricsSummary,
    after: &MetricsSummary,
    params: &ImpactParams,
) -> ImpactReport {
    let changes = TRACKED_INDICES
        .map(|index| percent_change(before.get(index).mean, after.get(index).mean, params.epsilon));
    let weighted: f64 = changes
        .iter()
        .zip(params.weights.as_array())
        .map(|(change, weight)| change * weight)
        .sum();

    let impact_score = params
        .score_range
        .clamp(params.neutral_score + weighted * params.weighted_scale);
    let [ndvi, evi, fvc, lai] = changes;

    ImpactReport {
        impact_score,
        confidence: confidence(before, after, &params.confidence),
        category: ImpactCategory::from_score(impact_score, &params.thresholds),
        ndvi_change_percent: ndvi,
        evi_change_percent: evi,
        fvc_change_percent: fvc,
        lai_change_percent: lai,
        weighted_score: weighted,
    }
}

/// Impact scoring as a pipeline stage
#[derive(Debug, Clone, Default)]
pub struct ImpactAnalysis;

impl Algorithm for ImpactAnalysis {
    type Input = (MetricsSummary, MetricsSummary);
    type Output = ImpactReport;
    type Params = ImpactParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ImpactAnalysis"
    }

    fn description(&self) -> &'static str {
        "Weighted before/after change score with category and confidence"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        params.validate()?;
        let (before, after) = input;
        Ok(analyze_impact(&before, &after, &params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::IndexStats;

    /// Summary with the given NDVI/EVI/FVC/LAI means and stds; other indices zero
    fn summary(means: [f64; 4], stds: [f64; 4]) -> MetricsSummary {
        MetricsSummary::from_fn(|index| {
            let slot = TRACKED_INDICES.iter().position(|&tracked| tracked == index);
            let (mean, std) = slot.map(|i| (means[i], stds[i])).unwrap_or((0.0, 0.0));
            IndexStats {
                mean,
                std,
                max: mean,
                min: mean,
            }
        })
    }

    #[test]
    fn test_identical_summaries_are_neutral() {
        let s = summary([0.3, 0.2, 0.1, 0.4], [0.1, 0.1, 0.2, 0.3]);
        let report = analyze_impact(&s, &s, &ImpactParams::default());
        assert_eq!(report.impact_score, 50.0);
        assert_eq!(report.weighted_score, 0.0);
        assert_eq!(report.category, ImpactCategory::Moderate);
        assert_eq!(report.confidence, 70.0);
    }

    #[test]
    fn test_doubled_means() {
        let before = summary([0.2, 0.1, 0.1, 0.1], [0.0; 4]);
        let after = summary([0.4, 0.2, 0.2, 0.2], [0.0; 4]);
        let report = analyze_impact(&before, &after, &ImpactParams::default());

        assert!((report.ndvi_change_percent - 100.0).abs() < 1e-3);
        assert!((report.lai_change_percent - 100.0).abs() < 1e-3);
        assert!((report.weighted_score - 100.0).abs() < 1e-2);
        assert!((report.impact_score - 100.0).abs() < 1e-2);
        assert_eq!(report.category, ImpactCategory::Excellent);
        assert_eq!(report.confidence, 70.0);
    }

    #[test]
    fn test_collapse_is_very_poor() {
        let before = summary([0.5, 0.4, 0.6, 1.2], [0.0; 4]);
        let after = summary([0.0, 0.0, 0.0, 0.0], [0.0; 4]);
        let report = analyze_impact(&before, &after, &ImpactParams::default());
        assert!((report.weighted_score + 100.0).abs() < 1e-2);
        assert!(report.impact_score < 1.0);
        assert_eq!(report.category, ImpactCategory::VeryPoor);
    }

    #[test]
    fn test_score_saturates() {
        let before = summary([0.01, 0.01, 0.01, 0.01], [0.0; 4]);
        let after = summary([0.9, 0.9, 0.9, 0.9], [0.0; 4]);
        let report = analyze_impact(&before, &after, &ImpactParams::default());
        assert!(report.weighted_score > 1000.0);
        assert_eq!(report.impact_score, 100.0);
    }

    #[test]
    fn test_category_boundaries() {
        let t = CategoryThresholds::default();
        assert_eq!(ImpactCategory::from_score(80.0, &t), ImpactCategory::Excellent);
        assert_eq!(ImpactCategory::from_score(79.999, &t), ImpactCategory::Good);
        assert_eq!(ImpactCategory::from_score(65.0, &t), ImpactCategory::Good);
        assert_eq!(ImpactCategory::from_score(50.0, &t), ImpactCategory::Moderate);
        assert_eq!(ImpactCategory::from_score(49.999, &t), ImpactCategory::Poor);
        assert_eq!(ImpactCategory::from_score(35.0, &t), ImpactCategory::Poor);
        assert_eq!(ImpactCategory::from_score(0.0, &t), ImpactCategory::VeryPoor);
        assert_eq!(ImpactCategory::from_score(f64::NAN, &t), ImpactCategory::VeryPoor);
    }

    #[test]
    fn test_confidence_bounds() {
        let params = ConfidenceParams::default();
        let calm = summary([0.2; 4], [0.0; 4]);
        let wild = summary([0.2; 4], [10.0; 4]);
        assert_eq!(confidence(&calm, &wild, &params), 50.0);

        // 0.5 + 0.5 + 0 + 0 std drift costs 5 points
        let drift = summary([0.2; 4], [0.5, 0.5, 0.0, 0.0]);
        assert!((confidence(&calm, &drift, &params) - 65.0).abs() < 1e-12);

        let generous = ConfidenceParams {
            base: 500.0,
            ..ConfidenceParams::default()
        };
        assert_eq!(confidence(&calm, &calm, &generous), 95.0);
    }

    #[test]
    fn test_percent_change_zero_baseline() {
        let change = percent_change(0.0, 0.1, DEFAULT_EPSILON);
        assert!(change.is_finite());
        assert!((change - 0.1 / 1e-6 * 100.0).abs() < 1e-3);
        assert_eq!(percent_change(-0.5, -0.25, 0.0), 50.0);
    }

    #[test]
    fn test_report_json_contract() {
        let before = summary([0.2, 0.1, 0.1, 0.1], [0.0; 4]);
        let report = analyze_impact(&before, &before, &ImpactParams::default());
        let json = serde_json::to_value(&report).unwrap();
        for key in [
            "impact_score",
            "confidence",
            "category",
            "ndvi_change_percent",
            "evi_change_percent",
            "fvc_change_percent",
            "lai_change_percent",
            "weighted_score",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["category"], "Moderate");
        assert_eq!(
            serde_json::to_value(ImpactCategory::VeryPoor).unwrap(),
            "Very Poor"
        );
    }

    #[test]
    fn test_validate() {
        assert!(ImpactParams::default().validate().is_ok());
        let unordered = ImpactParams {
            thresholds: CategoryThresholds {
                good: 90.0,
                ..CategoryThresholds::default()
            },
            ..ImpactParams::default()
        };
        assert!(unordered.validate().is_err());
        let nan_weight = ImpactParams {
            weights: ImpactWeights {
                evi: f64::NAN,
                ..ImpactWeights::default()
            },
            ..ImpactParams::default()
        };
        assert!(ImpactAnalysis
            .execute((summary([0.1; 4], [0.0; 4]), summary([0.1; 4], [0.0; 4])), nan_weight)
            .is_err());
    }
}
