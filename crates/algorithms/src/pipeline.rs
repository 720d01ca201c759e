//! Before/after analysis pipeline
//!
//! Each side runs decode -> indices -> metrics independently; the two
//! branches meet at impact scoring, after which the result is assembled.

use std::time::Instant;

use tracing::{debug, info};
use verileaf_core::io::{Decoder, ImageDecoder};
use verileaf_core::{Error, Result, RgbRaster};

use crate::change::analyze_impact;
use crate::config::AnalysisConfig;
use crate::maybe_rayon::join;
use crate::report::{AnalysisResult, ResultAssembler, ResultStore};
use crate::statistics::{compute_metrics, MetricsSummary};

/// Message carried by [`Error::MissingInput`] when either image is absent
pub const MISSING_IMAGES: &str = "Both before and after images are required";

/// Runs complete analyses with one decoder and one configuration
pub struct Analyzer {
    decoder: Box<dyn Decoder>,
    config: AnalysisConfig,
}

impl Analyzer {
    /// Fails if the configuration does not validate
    pub fn new(decoder: Box<dyn Decoder>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { decoder, config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn decoder_name(&self) -> &'static str {
        self.decoder.name()
    }

    /// Decode one image
    pub fn decode(&self, bytes: &[u8]) -> Result<RgbRaster> {
        let rgb = self.decoder.decode(bytes)?;
        debug!(
            decoder = self.decoder.name(),
            "Decoded {} bytes into {}x{} raster",
            bytes.len(),
            rgb.rows(),
            rgb.cols()
        );
        Ok(rgb)
    }

    /// Indices and summary of one decoded raster
    pub fn summarize(&self, rgb: &RgbRaster) -> Result<MetricsSummary> {
        let start = Instant::now();
        let summary = compute_metrics(rgb, &self.config.indices)?;
        debug!(
            "Summarized {}x{} raster in {:.1?}",
            rgb.rows(),
            rgb.cols(),
            start.elapsed()
        );
        Ok(summary)
    }

    /// Decode and summarize one image
    pub fn summarize_bytes(&self, bytes: &[u8]) -> Result<MetricsSummary> {
        self.summarize(&self.decode(bytes)?)
    }

    /// Full analysis from encoded image bytes.
    ///
    /// Missing inputs are rejected before anything is decoded. When both
    /// branches fail, the before-side error is reported.
    pub fn analyze_bytes(&self, before: Option<&[u8]>, after: Option<&[u8]>) -> Result<AnalysisResult> {
        let (before, after) = match (before, after) {
            (Some(before), Some(after)) => (before, after),
            _ => return Err(Error::MissingInput(MISSING_IMAGES.to_string())),
        };

        let (before, after) = join(|| self.branch(before), || self.branch(after));
        let (before_rgb, before_metrics) = before?;
        let (after_rgb, after_metrics) = after?;

        self.finish(&before_rgb, &after_rgb, before_metrics, after_metrics)
    }

    /// Full analysis of already decoded rasters
    pub fn analyze_rasters(&self, before: &RgbRaster, after: &RgbRaster) -> Result<AnalysisResult> {
        let (before_metrics, after_metrics) = join(|| self.summarize(before), || self.summarize(after));
        self.finish(before, after, before_metrics?, after_metrics?)
    }

    /// [`Analyzer::analyze_bytes`] followed by `store.persist`
    pub fn analyze_and_persist(
        &self,
        before: Option<&[u8]>,
        after: Option<&[u8]>,
        store: &dyn ResultStore,
    ) -> Result<AnalysisResult> {
        let result = self.analyze_bytes(before, after)?;
        store.persist(&result)?;
        Ok(result)
    }

    fn branch(&self, bytes: &[u8]) -> Result<(RgbRaster, MetricsSummary)> {
        let rgb = self.decode(bytes)?;
        let metrics = self.summarize(&rgb)?;
        Ok((rgb, metrics))
    }

    fn finish(
        &self,
        before: &RgbRaster,
        after: &RgbRaster,
        before_metrics: MetricsSummary,
        after_metrics: MetricsSummary,
    ) -> Result<AnalysisResult> {
        let impact = analyze_impact(&before_metrics, &after_metrics, &self.config.impact);
        debug!(
            weighted = impact.weighted_score,
            "Impact score {:.2} ({})",
            impact.impact_score,
            impact.category
        );

        let result = ResultAssembler::new(self.config.image_format).assemble(
            before,
            after,
            before_metrics,
            after_metrics,
            impact,
        )?;
        info!(
            session = %result.session_id,
            "Analysis complete: score {:.2}, {}, confidence {:.1}",
            result.impact_analysis.impact_score,
            result.impact_analysis.category,
            result.impact_analysis.confidence
        );
        Ok(result)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            decoder: Box::new(ImageDecoder),
            config: AnalysisConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ImpactCategory;
    use crate::report::{MemoryStore, Status};
    use verileaf_core::io::TiffDecoder;

    #[test]
    fn test_missing_inputs() {
        let analyzer = Analyzer::default();
        for (before, after) in [
            (None, Some(&b"x"[..])),
            (Some(&b"x"[..]), None),
            (None, None),
        ] {
            let err = analyzer.analyze_bytes(before, after).unwrap_err();
            assert!(matches!(&err, Error::MissingInput(msg) if msg == MISSING_IMAGES));
        }
    }

    #[test]
    fn test_decode_error_propagates() {
        let err = Analyzer::default()
            .analyze_bytes(Some(&b"not an image"[..]), Some(&b"also not"[..]))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_identical_rasters() {
        let rgb = RgbRaster::filled(5, 5, [0.3, 0.5, 0.2]).unwrap();
        let result = Analyzer::default().analyze_rasters(&rgb, &rgb).unwrap();
        assert_eq!(result.status, Status::Success);
        assert_eq!(result.before_metrics, result.after_metrics);
        assert_eq!(result.impact_analysis.impact_score, 50.0);
        assert_eq!(result.impact_analysis.category, ImpactCategory::Moderate);
        assert_eq!(result.impact_analysis.confidence, 70.0);
    }

    #[test]
    fn test_greening_scores_high() {
        let before = RgbRaster::filled(4, 4, [0.45, 0.5, 0.4]).unwrap();
        let after = RgbRaster::filled(4, 4, [0.1, 0.8, 0.1]).unwrap();
        let result = Analyzer::default().analyze_rasters(&before, &after).unwrap();
        assert!(result.impact_analysis.ndvi_change_percent > 0.0);
        assert_eq!(result.impact_analysis.category, ImpactCategory::Excellent);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.indices.epsilon = f64::NAN;
        assert!(Analyzer::new(Box::new(ImageDecoder), config).is_err());
    }

    #[test]
    fn test_persist() {
        let analyzer = Analyzer::new(Box::new(TiffDecoder), AnalysisConfig::default()).unwrap();
        assert_eq!(analyzer.decoder_name(), "tiff");

        let rgb = RgbRaster::filled(2, 2, [0.2, 0.6, 0.2]).unwrap();
        let store = MemoryStore::new(4);
        let result = analyzer.analyze_rasters(&rgb, &rgb).unwrap();
        store.persist(&result).unwrap();
        assert_eq!(store.load(&result.session_id).unwrap(), result);

        let err = analyzer
            .analyze_and_persist(Some(&b"junk"[..]), None, &store)
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
        assert_eq!(store.len(), 1);
    }
}
