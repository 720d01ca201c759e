//! # VeriLeaf Core
//!
//! Core types, traits and codecs for the VeriLeaf vegetation analysis library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band grid type
//! - `RgbRaster`: Normalized colour raster produced by image decoding
//! - `Decoder`: Interchangeable image decoding backends
//! - Data-URL re-encoding and TIFF export of index rasters

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{Raster, RasterElement, RgbRaster};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::{Decoder, DecoderKind, ImageFormat};
    pub use crate::raster::{Raster, RasterElement, RgbRaster};
    pub use crate::Algorithm;
}

/// Core trait for the pipeline stages in VeriLeaf.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
