//! Visible-band vegetation indices
//!
//! RGB-only approximations of the common remote sensing indices. True NDVI
//! and EVI need a near-infrared band; here green stands in for NIR.
//!
//! | Index | Formula | Range |
//! |---|---|---|
//! | NDVI | `(G - R) / (G + R + eps)` | [-1, 1] |
//! | EVI | `2.5 (G - R) / (G + 6R - 7.5B + 1 + eps)` | [-1, 1] |
//! | NDWI | `(G - B) / (G + B + eps)` | [-1, 1] |
//! | SAVI | `1.5 (G - R) / (G + R + 0.5 + eps)` | [-1, 1] |
//! | FVC | `clamp((NDVI - 0.2) / (0.86 - 0.2 + eps), 0, 1)^2` | [0, 1] |
//! | LAI | `-ln(1 - clamp(FVC, 0, 0.99) + eps)` | [0, 6] |
//!
//! FVC is derived from NDVI and LAI from FVC. A single index only evaluates
//! its own chain; the full set shares the FVC value between FVC and LAI.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use verileaf_core::raster::{Raster, RgbRaster};
use verileaf_core::{Algorithm, Error, Result};

use crate::maybe_rayon::zip_for_each;

/// Additive stabilizer applied to every denominator
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// NDVI of bare soil (zero cover anchor)
pub const NDVI_SOIL: f64 = 0.2;

/// NDVI of full vegetation (full cover anchor)
pub const NDVI_VEGETATION: f64 = 0.86;

/// FVC is capped here before the LAI logarithm
pub const LAI_FVC_CAP: f64 = 0.99;

/// Valid range of the normalized-difference style indices
pub const NORMALIZED_RANGE: ValueRange = ValueRange::new(-1.0, 1.0);

/// Valid range of fractional vegetation cover
pub const FVC_RANGE: ValueRange = ValueRange::new(0.0, 1.0);

/// Valid range of leaf area index
pub const LAI_RANGE: ValueRange = ValueRange::new(0.0, 6.0);

/// The six indices derived from one colour raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VegetationIndex {
    /// Normalized Difference Vegetation Index (green/red proxy)
    Ndvi,
    /// Enhanced Vegetation Index (green/red/blue proxy)
    Evi,
    /// Normalized Difference Water Index (green/blue variant)
    Ndwi,
    /// Soil Adjusted Vegetation Index
    Savi,
    /// Fractional Vegetation Cover
    Fvc,
    /// Leaf Area Index
    Lai,
}

impl VegetationIndex {
    /// All indices in computation order
    pub const ALL: [VegetationIndex; 6] = [
        VegetationIndex::Ndvi,
        VegetationIndex::Evi,
        VegetationIndex::Ndwi,
        VegetationIndex::Savi,
        VegetationIndex::Fvc,
        VegetationIndex::Lai,
    ];

    /// Lower-case name used as the metric key prefix
    pub fn key(&self) -> &'static str {
        match self {
            VegetationIndex::Ndvi => "ndvi",
            VegetationIndex::Evi => "evi",
            VegetationIndex::Ndwi => "ndwi",
            VegetationIndex::Savi => "savi",
            VegetationIndex::Fvc => "fvc",
            VegetationIndex::Lai => "lai",
        }
    }

    /// Human-readable formula text
    pub fn description(&self) -> &'static str {
        match self {
            VegetationIndex::Ndvi => "Visible NDVI approximation: (G - R) / (G + R) from RGB.",
            VegetationIndex::Evi => {
                "Visible EVI approximation: 2.5 * (G - R) / (G + 6R - 7.5B + 1)."
            }
            VegetationIndex::Ndwi => "Visible NDWI variant: (G - B) / (G + B).",
            VegetationIndex::Savi => "SAVI approximation (L=0.5): 1.5 * (G - R) / (G + R + 0.5).",
            VegetationIndex::Fvc => "Fractional Vegetation Cover derived from NDVI (0..1).",
            VegetationIndex::Lai => {
                "Leaf Area Index derived from FVC via Beer-Lambert approximation."
            }
        }
    }
}

impl fmt::Display for VegetationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for VegetationIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        VegetationIndex::ALL
            .into_iter()
            .find(|index| index.key() == lower)
            .ok_or_else(|| Error::InvalidParameter {
                name: "index",
                value: s.to_string(),
                reason: "expected one of ndvi, evi, ndwi, savi, fvc, lai".to_string(),
            })
    }
}

/// Index key to formula description, as served by the descriptions endpoint
pub fn index_descriptions() -> BTreeMap<&'static str, &'static str> {
    VegetationIndex::ALL
        .iter()
        .map(|index| (index.key(), index.description()))
        .collect()
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Closed interval an index is clamped into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp into the range. NaN passes through unchanged.
    pub fn clamp(&self, value: f64) -> f64 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Final clamp ranges, one per index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexRanges {
    pub ndvi: ValueRange,
    pub evi: ValueRange,
    pub ndwi: ValueRange,
    pub savi: ValueRange,
    pub fvc: ValueRange,
    pub lai: ValueRange,
}

impl Default for IndexRanges {
    fn default() -> Self {
        Self {
            ndvi: NORMALIZED_RANGE,
            evi: NORMALIZED_RANGE,
            ndwi: NORMALIZED_RANGE,
            savi: NORMALIZED_RANGE,
            fvc: FVC_RANGE,
            lai: LAI_RANGE,
        }
    }
}

impl IndexRanges {
    pub fn get(&self, index: VegetationIndex) -> ValueRange {
        match index {
            VegetationIndex::Ndvi => self.ndvi,
            VegetationIndex::Evi => self.evi,
            VegetationIndex::Ndwi => self.ndwi,
            VegetationIndex::Savi => self.savi,
            VegetationIndex::Fvc => self.fvc,
            VegetationIndex::Lai => self.lai,
        }
    }
}

/// Parameters for the visible EVI proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EviParams {
    /// Gain factor (default: 2.5)
    pub g: f64,
    /// Coefficient for the red band (default: 6.0)
    pub c1: f64,
    /// Coefficient for the blue band (default: 7.5)
    pub c2: f64,
    /// Canopy background adjustment (default: 1.0)
    pub l: f64,
}

impl Default for EviParams {
    fn default() -> Self {
        Self {
            g: 2.5,
            c1: 6.0,
            c2: 7.5,
            l: 1.0,
        }
    }
}

/// Parameters for SAVI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaviParams {
    /// Soil brightness correction factor (0 = high vegetation, 1 = low vegetation)
    /// Default: 0.5
    pub l_factor: f64,
}

impl Default for SaviParams {
    fn default() -> Self {
        Self { l_factor: 0.5 }
    }
}

/// Soil and vegetation NDVI anchors for fractional cover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvcParams {
    pub ndvi_soil: f64,
    pub ndvi_veg: f64,
}

impl Default for FvcParams {
    fn default() -> Self {
        Self {
            ndvi_soil: NDVI_SOIL,
            ndvi_veg: NDVI_VEGETATION,
        }
    }
}

impl FvcParams {
    /// Fractional cover for one NDVI value.
    ///
    /// Linear between the anchors, clipped to [0, 1], then squared.
    pub fn cover(&self, ndvi: f64, epsilon: f64) -> f64 {
        let scaled = (ndvi - self.ndvi_soil) / (self.ndvi_veg - self.ndvi_soil + epsilon);
        let clipped = FVC_RANGE.clamp(scaled);
        clipped * clipped
    }
}

/// Everything the index computation depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Additive stabilizer for every denominator
    pub epsilon: f64,
    pub evi: EviParams,
    pub savi: SaviParams,
    pub fvc: FvcParams,
    /// Upper bound applied to FVC before the LAI logarithm
    pub lai_fvc_cap: f64,
    pub ranges: IndexRanges,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            evi: EviParams::default(),
            savi: SaviParams::default(),
            fvc: FvcParams::default(),
            lai_fvc_cap: LAI_FVC_CAP,
            ranges: IndexRanges::default(),
        }
    }
}

impl IndexParams {
    /// Reject parameter sets that would make the computation ill-defined
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(invalid("epsilon", self.epsilon, "must be finite and >= 0"));
        }
        let coefficients = [
            ("evi.g", self.evi.g),
            ("evi.c1", self.evi.c1),
            ("evi.c2", self.evi.c2),
            ("evi.l", self.evi.l),
            ("savi.l_factor", self.savi.l_factor),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() {
                return Err(invalid(name, value, "must be finite"));
            }
        }
        if self.savi.l_factor < 0.0 {
            return Err(invalid("savi.l_factor", self.savi.l_factor, "must be >= 0"));
        }
        if !(self.fvc.ndvi_soil.is_finite() && self.fvc.ndvi_veg.is_finite())
            || self.fvc.ndvi_veg <= self.fvc.ndvi_soil
        {
            return Err(invalid(
                "fvc.ndvi_veg",
                self.fvc.ndvi_veg,
                "must be finite and greater than fvc.ndvi_soil",
            ));
        }
        if !(0.0..=1.0).contains(&self.lai_fvc_cap) {
            return Err(invalid("lai_fvc_cap", self.lai_fvc_cap, "must lie in [0, 1]"));
        }
        for index in VegetationIndex::ALL {
            let range = self.ranges.get(index);
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(invalid(
                    "ranges",
                    range.min,
                    &format!("{} range must be finite with min <= max", index),
                ));
            }
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

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Six index rasters of identical shape, computed from one colour raster
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSet {
    pub ndvi: Raster<f64>,
    pub evi: Raster<f64>,
    pub ndwi: Raster<f64>,
    pub savi: Raster<f64>,
    pub fvc: Raster<f64>,
    pub lai: Raster<f64>,
}

impl IndexSet {
    pub fn get(&self, index: VegetationIndex) -> &Raster<f64> {
        match index {
            VegetationIndex::Ndvi => &self.ndvi,
            VegetationIndex::Evi => &self.evi,
            VegetationIndex::Ndwi => &self.ndwi,
            VegetationIndex::Savi => &self.savi,
            VegetationIndex::Fvc => &self.fvc,
            VegetationIndex::Lai => &self.lai,
        }
    }

    /// Iterate in computation order
    pub fn iter(&self) -> impl Iterator<Item = (VegetationIndex, &Raster<f64>)> {
        VegetationIndex::ALL.into_iter().map(move |index| (index, self.get(index)))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.ndvi.shape()
    }
}

/// `num / den`, defined as 0 whenever the numerator is 0.
///
/// Keeps 0/0 from producing NaN when the stabilizer is disabled or a
/// denominator cancels exactly. A non-zero numerator over zero yields an
/// infinity that the final clamp folds back into range.
fn ratio(num: f64, den: f64) -> f64 {
    if num == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn ndvi(red: f64, green: f64, params: &IndexParams) -> f64 {
    ratio(green - red, green + red + params.epsilon)
}

fn evi(red: f64, green: f64, blue: f64, params: &IndexParams) -> f64 {
    let p = &params.evi;
    ratio(
        p.g * (green - red),
        green + p.c1 * red - p.c2 * blue + p.l + params.epsilon,
    )
}

fn ndwi(green: f64, blue: f64, params: &IndexParams) -> f64 {
    ratio(green - blue, green + blue + params.epsilon)
}

fn savi(red: f64, green: f64, params: &IndexParams) -> f64 {
    let l = params.savi.l_factor;
    ratio((1.0 + l) * (green - red), green + red + l + params.epsilon)
}

/// FVC from the unclamped NDVI
fn fvc(red: f64, green: f64, params: &IndexParams) -> f64 {
    params.fvc.cover(ndvi(red, green, params), params.epsilon)
}

/// LAI from the unclamped FVC
fn lai(fvc: f64, params: &IndexParams) -> f64 {
    let capped = ValueRange::new(0.0, params.lai_fvc_cap).clamp(fvc);
    -(1.0 - capped + params.epsilon).ln()
}

/// One clamped index value for one pixel.
///
/// Only the dependency chain of `index` is evaluated: FVC recomputes NDVI
/// and LAI recomputes FVC, the other four read the bands directly.
pub fn pixel_index(
    index: VegetationIndex,
    red: f64,
    green: f64,
    blue: f64,
    params: &IndexParams,
) -> f64 {
    let raw = match index {
        VegetationIndex::Ndvi => ndvi(red, green, params),
        VegetationIndex::Evi => evi(red, green, blue, params),
        VegetationIndex::Ndwi => ndwi(green, blue, params),
        VegetationIndex::Savi => savi(red, green, params),
        VegetationIndex::Fvc => fvc(red, green, params),
        VegetationIndex::Lai => lai(fvc(red, green, params), params),
    };
    params.ranges.get(index).clamp(raw)
}

/// All six clamped index values for one pixel, in [`VegetationIndex::ALL`] order
pub fn pixel_indices(red: f64, green: f64, blue: f64, params: &IndexParams) -> [f64; 6] {
    let r = &params.ranges;
    let cover = fvc(red, green, params);
    [
        r.ndvi.clamp(ndvi(red, green, params)),
        r.evi.clamp(evi(red, green, blue, params)),
        r.ndwi.clamp(ndwi(green, blue, params)),
        r.savi.clamp(savi(red, green, params)),
        r.fvc.clamp(cover),
        r.lai.clamp(lai(cover, params)),
    ]
}

/// Compute all six index rasters from a colour raster.
///
/// Each index is written straight into its own output grid. The six grids
/// are filled by two element-wise passes of three outputs each, so peak
/// memory is the six outputs themselves.
///
/// Total over valid input: with a positive stabilizer every output value is
/// finite and inside its configured range, including for all-black and
/// all-white rasters.
pub fn compute_indices(rgb: &RgbRaster, params: &IndexParams) -> IndexSet {
    let shape = rgb.shape();
    let (red, green, blue) = (rgb.red().view(), rgb.green().view(), rgb.blue().view());
    let r = &params.ranges;

    let mut ndvi_out = Array2::<f64>::zeros(shape);
    let mut evi_out = Array2::<f64>::zeros(shape);
    let mut ndwi_out = Array2::<f64>::zeros(shape);
    zip_for_each!(
        Zip::from(&mut ndvi_out)
            .and(&mut evi_out)
            .and(&mut ndwi_out)
            .and(&red)
            .and(&green)
            .and(&blue),
        |ndvi_px, evi_px, ndwi_px, &rv, &gv, &bv| {
            let (rv, gv, bv) = (rv as f64, gv as f64, bv as f64);
            *ndvi_px = r.ndvi.clamp(ndvi(rv, gv, params));
            *evi_px = r.evi.clamp(evi(rv, gv, bv, params));
            *ndwi_px = r.ndwi.clamp(ndwi(gv, bv, params));
        }
    );

    let mut savi_out = Array2::<f64>::zeros(shape);
    let mut fvc_out = Array2::<f64>::zeros(shape);
    let mut lai_out = Array2::<f64>::zeros(shape);
    zip_for_each!(
        Zip::from(&mut savi_out)
            .and(&mut fvc_out)
            .and(&mut lai_out)
            .and(&red)
            .and(&green),
        |savi_px, fvc_px, lai_px, &rv, &gv| {
            let (rv, gv) = (rv as f64, gv as f64);
            let cover = fvc(rv, gv, params);
            *savi_px = r.savi.clamp(savi(rv, gv, params));
            *fvc_px = r.fvc.clamp(cover);
            *lai_px = r.lai.clamp(lai(cover, params));
        }
    );

    IndexSet {
        ndvi: Raster::from_array(ndvi_out),
        evi: Raster::from_array(evi_out),
        ndwi: Raster::from_array(ndwi_out),
        savi: Raster::from_array(savi_out),
        fvc: Raster::from_array(fvc_out),
        lai: Raster::from_array(lai_out),
    }
}

/// Compute a single index raster, evaluating only that index's chain
pub fn compute_index(rgb: &RgbRaster, index: VegetationIndex, params: &IndexParams) -> Raster<f64> {
    let mut out = Array2::<f64>::zeros(rgb.shape());
    zip_for_each!(
        Zip::from(&mut out)
            .and(rgb.red().view())
            .and(rgb.green().view())
            .and(rgb.blue().view()),
        |px, &rv, &gv, &bv| {
            *px = pixel_index(index, rv as f64, gv as f64, bv as f64, params);
        }
    );
    Raster::from_array(out)
}

/// Index computation as a pipeline stage
#[derive(Debug, Clone, Default)]
pub struct VegetationIndices;

impl Algorithm for VegetationIndices {
    type Input = RgbRaster;
    type Output = IndexSet;
    type Params = IndexParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "VegetationIndices"
    }

    fn description(&self) -> &'static str {
        "Visible-band NDVI, EVI, NDWI, SAVI, FVC and LAI from an RGB raster"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        params.validate()?;
        Ok(compute_indices(&input, &params))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
