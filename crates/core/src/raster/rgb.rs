//! Normalized three-band colour raster

use crate::error::{Error, Result};
use crate::raster::Raster;

/// A height x width x 3 colour raster with every channel in [0, 1].
///
/// Produced once by a [`Decoder`](crate::io::Decoder) and never mutated
/// afterwards; the bands are only reachable through shared references.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbRaster {
    red: Raster<f32>,
    green: Raster<f32>,
    blue: Raster<f32>,
}

impl RgbRaster {
    /// Build from three bands of identical shape.
    ///
    /// Fails on empty or mismatched bands and on values outside [0, 1].
    pub fn from_bands(red: Raster<f32>, green: Raster<f32>, blue: Raster<f32>) -> Result<Self> {
        let (rows, cols) = red.shape();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        for band in [&green, &blue] {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
        }
        for (name, band) in [("red", &red), ("green", &green), ("blue", &blue)] {
            if let Some(bad) = band.data().iter().find(|v| !(0.0..=1.0).contains(*v)) {
                return Err(Error::InvalidParameter {
                    name: "channel",
                    value: bad.to_string(),
                    reason: format!("{} channel values must lie in [0, 1]", name),
                });
            }
        }

        Ok(Self { red, green, blue })
    }

    /// Build from an interleaved `[r, g, b, r, g, b, ...]` buffer.
    pub fn from_interleaved(data: &[f32], rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols * 3 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let mut bands = [
            Vec::with_capacity(rows * cols),
            Vec::with_capacity(rows * cols),
            Vec::with_capacity(rows * cols),
        ];
        for px in data.chunks_exact(3) {
            bands[0].push(px[0]);
            bands[1].push(px[1]);
            bands[2].push(px[2]);
        }
        let [r, g, b] = bands;

        Self::from_bands(
            Raster::from_vec(r, rows, cols)?,
            Raster::from_vec(g, rows, cols)?,
            Raster::from_vec(b, rows, cols)?,
        )
    }

    /// Build from 8-bit interleaved RGB, normalizing by 255.
    pub fn from_rgb8(data: &[u8], rows: usize, cols: usize) -> Result<Self> {
        let normalized: Vec<f32> = data.iter().map(|&v| v as f32 / 255.0).collect();
        Self::from_interleaved(&normalized, rows, cols)
    }

    /// Uniform raster with every pixel set to `rgb`.
    pub fn filled(rows: usize, cols: usize, rgb: [f32; 3]) -> Result<Self> {
        Self::from_bands(
            Raster::filled(rows, cols, rgb[0]),
            Raster::filled(rows, cols, rgb[1]),
            Raster::filled(rows, cols, rgb[2]),
        )
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.red.rows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.red.cols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.red.shape()
    }

    pub fn red(&self) -> &Raster<f32> {
        &self.red
    }

    pub fn green(&self) -> &Raster<f32> {
        &self.green
    }

    pub fn blue(&self) -> &Raster<f32> {
        &self.blue
    }

    /// Channels at (row, col) as `[r, g, b]`
    pub fn pixel(&self, row: usize, col: usize) -> Result<[f32; 3]> {
        Ok([
            self.red.get(row, col)?,
            self.green.get(row, col)?,
            self.blue.get(row, col)?,
        ])
    }

    /// Re-quantize to interleaved 8-bit RGB.
    ///
    /// Values are scaled by 255, clipped and truncated toward zero.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let quantize = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;
        let mut out = Vec::with_capacity(self.red.len() * 3);
        for ((r, g), b) in self
            .red
            .data()
            .iter()
            .zip(self.green.data().iter())
            .zip(self.blue.data().iter())
        {
            out.push(quantize(*r));
            out.push(quantize(*g));
            out.push(quantize(*b));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_split() {
        let data = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let rgb = RgbRaster::from_interleaved(&data, 1, 2).unwrap();
        assert_eq!(rgb.pixel(0, 1).unwrap(), [0.4, 0.5, 0.6]);
        assert_eq!(rgb.green().get(0, 0).unwrap(), 0.2);
    }

    #[test]
    fn test_rejects_empty() {
        let err = RgbRaster::from_interleaved(&[], 0, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = RgbRaster::filled(2, 2, [0.0, 1.5, 0.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert!(RgbRaster::filled(2, 2, [f32::NAN, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_band_mismatch() {
        let err = RgbRaster::from_bands(
            Raster::new(2, 2),
            Raster::new(2, 3),
            Raster::new(2, 2),
        )
        .unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }

    #[test]
    fn test_rgb8_roundtrip_truncates() {
        let bytes = [0u8, 128, 255];
        let rgb = RgbRaster::from_rgb8(&bytes, 1, 1).unwrap();
        assert_eq!(rgb.to_rgb8(), vec![0, 128, 255]);

        // 0.999 * 255 = 254.745 truncates to 254
        let rgb = RgbRaster::filled(1, 1, [0.999, 0.0, 1.0]).unwrap();
        assert_eq!(rgb.to_rgb8(), vec![254, 0, 255]);
    }
}
