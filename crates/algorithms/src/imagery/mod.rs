//! Imagery analysis algorithms
//!
//! Visible-band vegetation indices computed from a normalized RGB raster:
//! - Normalized differences: NDVI, NDWI
//! - Soil/atmosphere adjusted: EVI, SAVI
//! - Derived biophysical proxies: FVC (from NDVI), LAI (from FVC)

mod indices;

pub use indices::{
    compute_index, compute_indices, index_descriptions, pixel_index, pixel_indices, EviParams,
    FvcParams,
    IndexParams, IndexRanges, IndexSet, SaviParams, ValueRange, VegetationIndex,
    VegetationIndices, DEFAULT_EPSILON, FVC_RANGE, LAI_FVC_CAP, LAI_RANGE, NDVI_SOIL,
    NDVI_VEGETATION, NORMALIZED_RANGE,
};
