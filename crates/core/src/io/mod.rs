//! Image decoding and encoding
//!
//! Decoding is a capability chosen once at start-up: callers hold a
//! `Box<dyn Decoder>` built from a [`DecoderKind`] and never branch on the
//! backend afterwards.

mod image_codec;
mod tiff_codec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::RgbRaster;

pub use image_codec::{encode_data_url, ImageDecoder, ImageFormat};
pub use tiff_codec::{write_index_tiff, write_index_tiff_to_buffer, TiffDecoder};

/// Turns encoded image bytes into a normalized [`RgbRaster`].
///
/// Implementations must fail with [`Error::Decode`] on malformed or
/// unsupported input and never return values outside [0, 1].
pub trait Decoder: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Decode `bytes` into a colour raster
    fn decode(&self, bytes: &[u8]) -> Result<RgbRaster>;
}

/// Available decoding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// General purpose decoder (JPEG, PNG, TIFF, BMP, WebP)
    #[default]
    Image,
    /// TIFF-only decoder with 16-bit support
    Tiff,
}

impl DecoderKind {
    /// Instantiate the backend
    pub fn build(self) -> Box<dyn Decoder> {
        match self {
            DecoderKind::Image => Box::new(ImageDecoder),
            DecoderKind::Tiff => Box::new(TiffDecoder),
        }
    }
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderKind::Image => write!(f, "image"),
            DecoderKind::Tiff => write!(f, "tiff"),
        }
    }
}

impl FromStr for DecoderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "image" | "auto" => Ok(DecoderKind::Image),
            "tiff" | "tif" => Ok(DecoderKind::Tiff),
            _ => Err(Error::InvalidParameter {
                name: "decoder",
                value: s.to_string(),
                reason: "expected 'image' or 'tiff'".to_string(),
            }),
        }
    }
}
