//! Per-index summary statistics
//!
//! Each index raster is reduced to mean, population standard deviation,
//! maximum and minimum, skipping NaN cells. Rows are reduced in parallel into
//! partial accumulators which are merged in row order, so repeated runs over
//! the same raster give bit-identical results regardless of thread count.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use verileaf_core::raster::{Raster, RgbRaster};
use verileaf_core::{Algorithm, Error, Result};

use crate::imagery::{compute_indices, IndexParams, IndexSet, VegetationIndex};
use crate::maybe_rayon::*;

/// The four statistics kept per index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Mean,
    Std,
    Max,
    Min,
}

impl Stat {
    pub const ALL: [Stat; 4] = [Stat::Mean, Stat::Std, Stat::Max, Stat::Min];

    pub fn key(&self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Std => "std",
            Stat::Max => "max",
            Stat::Min => "min",
        }
    }
}

/// Metric key in the flat summary map, e.g. `ndvi_mean`
pub fn metric_key(index: VegetationIndex, stat: Stat) -> String {
    format!("{}_{}", index.key(), stat.key())
}

/// Summary of one index raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

impl IndexStats {
    /// Stats of a raster without a single defined cell
    pub const UNDEFINED: IndexStats = IndexStats {
        mean: f64::NAN,
        std: f64::NAN,
        max: f64::NAN,
        min: f64::NAN,
    };

    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Mean => self.mean,
            Stat::Std => self.std,
            Stat::Max => self.max,
            Stat::Min => self.min,
        }
    }

    pub fn is_finite(&self) -> bool {
        Stat::ALL.iter().all(|&stat| self.get(stat).is_finite())
    }
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    const EMPTY: Accumulator = Accumulator {
        count: 0,
        sum: 0.0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    fn push(mut self, value: f64) -> Self {
        if !value.is_nan() {
            self.count += 1;
            self.sum += value;
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self
    }

    fn merge(self, other: Accumulator) -> Self {
        Accumulator {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// NaN-aware mean / std / max / min of a raster.
///
/// The standard deviation is the population form (divides by N). A raster
/// with no defined cells yields [`IndexStats::UNDEFINED`].
pub fn summarize(raster: &Raster<f64>) -> IndexStats {
    let view = raster.view();
    let rows = raster.rows();

    let partials: Vec<Accumulator> = (0..rows)
        .into_par_iter()
        .map(|row| {
            view.row(row)
                .iter()
                .fold(Accumulator::EMPTY, |acc, &v| acc.push(v))
        })
        .collect();
    let total = partials
        .iter()
        .fold(Accumulator::EMPTY, |acc, &partial| acc.merge(partial));

    if total.count == 0 {
        return IndexStats::UNDEFINED;
    }

    let n = total.count as f64;
    let mean = total.sum / n;

    let squared: Vec<f64> = (0..rows)
        .into_par_iter()
        .map(|row| {
            view.row(row)
                .iter()
                .filter(|v| !v.is_nan())
                .map(|&v| (v - mean) * (v - mean))
                .sum::<f64>()
        })
        .collect();
    let variance = squared.iter().sum::<f64>() / n;

    IndexStats {
        mean,
        std: variance.sqrt(),
        max: total.max,
        min: total.min,
    }
}

/// Summary statistics of all six indices of one raster.
///
/// Serializes as a flat map of 24 `{index}_{stat}` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, f64>", try_from = "BTreeMap<String, f64>")]
pub struct MetricsSummary {
    pub ndvi: IndexStats,
    pub evi: IndexStats,
    pub ndwi: IndexStats,
    pub savi: IndexStats,
    pub fvc: IndexStats,
    pub lai: IndexStats,
}

impl MetricsSummary {
    /// Build by evaluating `f` once per index
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(VegetationIndex) -> IndexStats,
    {
        Self {
            ndvi: f(VegetationIndex::Ndvi),
            evi: f(VegetationIndex::Evi),
            ndwi: f(VegetationIndex::Ndwi),
            savi: f(VegetationIndex::Savi),
            fvc: f(VegetationIndex::Fvc),
            lai: f(VegetationIndex::Lai),
        }
    }

    /// Summarize every raster of an index set.
    ///
    /// Fails with [`Error::Computation`] if any statistic is not finite.
    /// A set produced by `compute_indices` from an `RgbRaster` with validated
    /// `IndexParams` never takes this path: every cell is clamped into a
    /// finite range and 0/0 is defined as 0. Only hand-built sets carrying
    /// NaN in every cell of a raster reach it.
    pub fn from_index_set(set: &IndexSet) -> Result<Self> {
        let summary = Self::from_fn(|index| summarize(set.get(index)));
        for index in VegetationIndex::ALL {
            let stats = summary.get(index);
            if !stats.is_finite() {
                return Err(Error::Computation(format!(
                    "{} summary is not finite ({} of {} cells undefined): {:?}",
                    index,
                    set.get(index).undefined_count(),
                    set.get(index).len(),
                    stats
                )));
            }
        }
        Ok(summary)
    }

    pub fn get(&self, index: VegetationIndex) -> IndexStats {
        match index {
            VegetationIndex::Ndvi => self.ndvi,
            VegetationIndex::Evi => self.evi,
            VegetationIndex::Ndwi => self.ndwi,
            VegetationIndex::Savi => self.savi,
            VegetationIndex::Fvc => self.fvc,
            VegetationIndex::Lai => self.lai,
        }
    }

    pub fn value(&self, index: VegetationIndex, stat: Stat) -> f64 {
        self.get(index).get(stat)
    }

    /// Look up a flat metric key such as `lai_std`
    pub fn lookup(&self, key: &str) -> Option<f64> {
        let (index, stat) = key.rsplit_once('_')?;
        let index: VegetationIndex = index.parse().ok()?;
        let stat = Stat::ALL.into_iter().find(|s| s.key() == stat)?;
        Some(self.value(index, stat))
    }

    /// The flat 24-entry map
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        for index in VegetationIndex::ALL {
            for stat in Stat::ALL {
                map.insert(metric_key(index, stat), self.value(index, stat));
            }
        }
        map
    }
}

impl From<MetricsSummary> for BTreeMap<String, f64> {
    fn from(summary: MetricsSummary) -> Self {
        summary.to_map()
    }
}

impl TryFrom<BTreeMap<String, f64>> for MetricsSummary {
    type Error = Error;

    fn try_from(mut map: BTreeMap<String, f64>) -> Result<Self> {
        let mut missing = None;
        let summary = Self::from_fn(|index| {
            let mut take = |stat: Stat| {
                let key = metric_key(index, stat);
                map.remove(&key).unwrap_or_else(|| {
                    missing.get_or_insert(key);
                    f64::NAN
                })
            };
            IndexStats {
                mean: take(Stat::Mean),
                std: take(Stat::Std),
                max: take(Stat::Max),
                min: take(Stat::Min),
            }
        });

        if let Some(key) = missing {
            return Err(Error::InvalidParameter {
                name: "metrics",
                value: key,
                reason: "summary entry is missing".to_string(),
            });
        }
        if let Some(key) = map.into_keys().next() {
            return Err(Error::InvalidParameter {
                name: "metrics",
                value: key,
                reason: "unknown summary entry".to_string(),
            });
        }
        Ok(summary)
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<6} {:>10} {:>10} {:>10} {:>10}", "index", "mean", "std", "min", "max")?;
        for index in VegetationIndex::ALL {
            let s = self.get(index);
            writeln!(
                f,
                "{:<6} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                index.key(),
                s.mean,
                s.std,
                s.min,
                s.max
            )?;
        }
        Ok(())
    }
}

/// Indices followed by aggregation: the per-branch work of an analysis
pub fn compute_metrics(rgb: &RgbRaster, params: &IndexParams) -> Result<MetricsSummary> {
    MetricsSummary::from_index_set(&compute_indices(rgb, params))
}

/// Aggregation as a pipeline stage
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregation;

impl Algorithm for MetricsAggregation {
    type Input = IndexSet;
    type Output = MetricsSummary;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "MetricsAggregation"
    }

    fn description(&self) -> &'static str {
        "NaN-aware mean, std, max and min of each index raster"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        MetricsSummary::from_index_set(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(values: &[f64], rows: usize, cols: usize) -> Raster<f64> {
        Raster::from_vec(values.to_vec(), rows, cols).unwrap()
    }

    #[test]
    fn test_summarize_basic() {
        let stats = summarize(&raster(&[1.0, 2.0, 3.0, 4.0], 2, 2));
        assert!((stats.mean - 2.5).abs() < 1e-12);
        // population variance of 1..4 = 1.25
        assert!((stats.std - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_summarize_skips_nan() {
        let stats = summarize(&raster(&[f64::NAN, 2.0, 4.0, f64::NAN], 2, 2));
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.std, 1.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_summarize_all_nan() {
        let stats = summarize(&Raster::filled(3, 3, f64::NAN));
        assert!(stats.mean.is_nan() && stats.std.is_nan());
        assert!(!stats.is_finite());
    }

    #[test]
    fn test_summarize_deterministic() {
        let values: Vec<f64> = (0..10_000).map(|i| ((i * 37) % 101) as f64 / 97.0 - 0.5).collect();
        let r = raster(&values, 100, 100);
        let a = summarize(&r);
        let b = summarize(&r);
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.std.to_bits(), b.std.to_bits());
    }

    #[test]
    fn test_summarize_row_order_independent() {
        let values: Vec<f64> = (0..600).map(|i| (i as f64 * 0.013).sin()).collect();
        let mut reversed = Vec::with_capacity(values.len());
        for row in values.chunks(20).rev() {
            reversed.extend_from_slice(row);
        }
        let a = summarize(&raster(&values, 30, 20));
        let b = summarize(&raster(&reversed, 30, 20));
        assert!((a.mean - b.mean).abs() < 1e-12);
        assert!((a.std - b.std).abs() < 1e-12);
        assert_eq!(a.min, b.min);
        assert_eq!(a.max, b.max);
    }

    #[test]
    fn test_metrics_from_pure_green() {
        let rgb = RgbRaster::filled(3, 3, [0.0, 1.0, 0.0]).unwrap();
        let summary = compute_metrics(&rgb, &IndexParams::default()).unwrap();
        assert_eq!(summary.fvc.mean, 1.0);
        assert_eq!(summary.fvc.std, 0.0);
        assert!((summary.ndvi.max - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_validated_params_never_fail_summary() {
        let unstabilized = IndexParams {
            epsilon: 0.0,
            lai_fvc_cap: 1.0,
            ..IndexParams::default()
        };
        unstabilized.validate().unwrap();
        for params in [IndexParams::default(), unstabilized] {
            for colour in [
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.5, 0.2],
                [1.0, 0.0, 1.0],
            ] {
                let rgb = RgbRaster::filled(3, 2, colour).unwrap();
                let summary = compute_metrics(&rgb, &params).unwrap();
                for index in VegetationIndex::ALL {
                    assert!(summary.get(index).is_finite(), "{:?} {}", colour, index);
                }
            }
        }
    }

    #[test]
    fn test_from_index_set_rejects_nan() {
        let rgb = RgbRaster::filled(2, 2, [0.5, 0.5, 0.5]).unwrap();
        let mut set = compute_indices(&rgb, &IndexParams::default());
        set.savi = Raster::filled(2, 2, f64::NAN);
        let err = MetricsSummary::from_index_set(&set).unwrap_err();
        assert!(matches!(err, Error::Computation(_)));
    }

    #[test]
    fn test_flat_map_keys() {
        let rgb = RgbRaster::filled(2, 2, [0.2, 0.5, 0.1]).unwrap();
        let summary = compute_metrics(&rgb, &IndexParams::default()).unwrap();
        let map = summary.to_map();
        assert_eq!(map.len(), 24);
        assert!(map.contains_key("ndwi_std"));
        assert_eq!(summary.lookup("lai_mean"), Some(summary.lai.mean));
        assert_eq!(summary.lookup("lai_median"), None);
        assert_eq!(summary.lookup("nbr_mean"), None);
    }

    #[test]
    fn test_serde_flat_roundtrip() {
        let rgb = RgbRaster::filled(2, 2, [0.2, 0.5, 0.1]).unwrap();
        let summary = compute_metrics(&rgb, &IndexParams::default()).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 24);
        assert_eq!(json["evi_min"].as_f64(), Some(summary.evi.min));

        let back: MetricsSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn test_serde_rejects_partial() {
        let mut map = MetricsSummary::from_fn(|_| IndexStats {
            mean: 0.0,
            std: 0.0,
            max: 0.0,
            min: 0.0,
        })
        .to_map();
        map.remove("fvc_max");
        let json = serde_json::to_string(&map).unwrap();
        assert!(serde_json::from_str::<MetricsSummary>(&json).is_err());

        map.insert("fvc_max".to_string(), 0.0);
        map.insert("fvc_median".to_string(), 0.0);
        let json = serde_json::to_string(&map).unwrap();
        assert!(serde_json::from_str::<MetricsSummary>(&json).is_err());
    }
}
