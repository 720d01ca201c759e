//! Analysis configuration
//!
//! Every field has a default, so a JSON file only needs the values it
//! overrides, e.g. `{"impact": {"weights": {"ndvi": 0.7, "evi": 0.1}}}`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use verileaf_core::io::ImageFormat;
use verileaf_core::Result;

use crate::change::ImpactParams;
use crate::imagery::IndexParams;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub indices: IndexParams,
    pub impact: ImpactParams,
    /// Transport encoding of the images embedded in results
    pub image_format: ImageFormat,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.indices.validate()?;
        self.impact.validate()
    }
}
