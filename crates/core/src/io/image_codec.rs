//! Decoding and data-URL encoding through the `image` crate

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use super::Decoder;
use crate::error::{Error, Result};
use crate::raster::RgbRaster;

/// Decoder for any format the `image` crate recognises.
///
/// Output is always 8-bit RGB before normalization: grayscale is replicated
/// across channels, alpha is dropped and 16-bit sources are reduced.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbRaster> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::Decode(format!("Failed to decode image bytes: {}", e)))?
            .into_rgb8();

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Decode("Image has no pixels".to_string()));
        }

        RgbRaster::from_rgb8(img.as_raw(), height as usize, width as usize)
    }
}

/// Transport encoding for re-encoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    fn codec(&self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "jpeg"),
            ImageFormat::Png => write!(f, "png"),
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            _ => Err(Error::InvalidParameter {
                name: "image_format",
                value: s.to_string(),
                reason: "expected 'jpeg' or 'png'".to_string(),
            }),
        }
    }
}

/// Encode a raster as `data:<mime>;base64,<payload>`.
pub fn encode_data_url(raster: &RgbRaster, format: ImageFormat) -> Result<String> {
    let (rows, cols) = raster.shape();
    let buffer = RgbImage::from_raw(cols as u32, rows as u32, raster.to_rgb8())
        .ok_or_else(|| Error::Encode("Pixel buffer does not match raster shape".to_string()))?;

    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), format.codec())
        .map_err(|e| Error::Encode(format!("Failed to encode {}: {}", format, e)))?;

    Ok(format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_png() {
        let bytes = png_bytes(4, 3, [0, 255, 51]);
        let rgb = ImageDecoder.decode(&bytes).unwrap();
        assert_eq!(rgb.shape(), (3, 4));
        let [r, g, b] = rgb.pixel(2, 3).unwrap();
        assert_eq!(r, 0.0);
        assert_eq!(g, 1.0);
        assert!((b - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_garbage() {
        let err = ImageDecoder.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_data_url_png_roundtrip() {
        let rgb = RgbRaster::filled(2, 2, [1.0, 0.0, 0.0]).unwrap();
        let url = encode_data_url(&rgb, ImageFormat::Png).unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        let back = ImageDecoder.decode(&bytes).unwrap();
        assert_eq!(back, rgb);
    }

    #[test]
    fn test_data_url_jpeg_prefix() {
        let rgb = RgbRaster::filled(8, 8, [0.2, 0.6, 0.1]).unwrap();
        let url = encode_data_url(&rgb, ImageFormat::Jpeg).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
