//! # VeriLeaf Algorithms
//!
//! Vegetation analysis of before/after RGB image pairs.
//!
//! ## Modules
//!
//! - **imagery**: Visible-band NDVI, EVI, NDWI, SAVI and the derived FVC, LAI
//! - **statistics**: NaN-aware per-index summaries
//! - **change**: Weighted impact score, category and confidence
//! - **report**: Result records, session ids and result stores
//! - **pipeline**: Decode -> indices -> metrics -> impact -> result

pub mod change;
pub mod config;
pub mod imagery;
pub mod pipeline;
pub mod report;
pub mod statistics;

pub(crate) mod maybe_rayon;

pub use config::AnalysisConfig;
pub use pipeline::Analyzer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::change::{
        analyze_impact, percent_change, ImpactAnalysis, ImpactCategory, ImpactParams,
        ImpactReport,
    };
    pub use crate::config::AnalysisConfig;
    pub use crate::imagery::{
        compute_index, compute_indices, index_descriptions, IndexParams, IndexSet,
        VegetationIndex, VegetationIndices,
    };
    pub use crate::pipeline::Analyzer;
    pub use crate::report::{
        AnalysisResult, ErrorReport, JsonFileStore, MemoryStore, ResultAssembler, ResultStore,
        SessionId,
    };
    pub use crate::statistics::{compute_metrics, IndexStats, MetricsAggregation, MetricsSummary};
    pub use verileaf_core::prelude::*;
}
