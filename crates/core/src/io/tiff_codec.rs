//! Native TIFF decoding and index export through the `tiff` crate
//!
//! The decoder accepts 8- and 16-bit gray, gray+alpha, RGB and RGBA
//! images. Index rasters are exported as single-band 32-bit float TIFFs.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder as TiffReader, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::ColorType;

use super::Decoder;
use crate::error::{Error, Result};
use crate::raster::{Raster, RgbRaster};

/// TIFF-only decoder that keeps 16-bit precision during normalization
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffDecoder;

impl Decoder for TiffDecoder {
    fn name(&self) -> &'static str {
        "tiff"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbRaster> {
        decode_tiff(Cursor::new(bytes))
    }
}

fn decode_tiff<R: Read + Seek>(reader: R) -> Result<RgbRaster> {
    let mut decoder =
        TiffReader::new(reader).map_err(|e| Error::Decode(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Decode(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let color = decoder
        .colortype()
        .map_err(|e| Error::Decode(format!("Cannot read color type: {}", e)))?;
    let (samples, bits) = match color {
        ColorType::Gray(bits) => (1, bits),
        ColorType::GrayA(bits) => (2, bits),
        ColorType::RGB(bits) => (3, bits),
        ColorType::RGBA(bits) => (4, bits),
        other => {
            return Err(Error::Decode(format!("Unsupported TIFF color type: {:?}", other)));
        }
    };

    let normalized: Vec<f32> = match decoder
        .read_image()
        .map_err(|e| Error::Decode(format!("Cannot read image data: {}", e)))?
    {
        DecodingResult::U8(buf) if bits == 8 => {
            buf.iter().map(|&v| v as f32 / u8::MAX as f32).collect()
        }
        DecodingResult::U16(buf) if bits == 16 => {
            buf.iter().map(|&v| v as f32 / u16::MAX as f32).collect()
        }
        _ => {
            return Err(Error::Decode(format!(
                "Unsupported TIFF sample format: {} bits",
                bits
            )));
        }
    };

    if normalized.len() != rows * cols * samples {
        return Err(Error::Decode(format!(
            "TIFF holds {} samples, expected {}x{}x{}",
            normalized.len(),
            rows,
            cols,
            samples
        )));
    }

    let mut interleaved = Vec::with_capacity(rows * cols * 3);
    for px in normalized.chunks_exact(samples) {
        match samples {
            1 | 2 => interleaved.extend_from_slice(&[px[0], px[0], px[0]]),
            _ => interleaved.extend_from_slice(&px[..3]),
        }
    }

    RgbRaster::from_interleaved(&interleaved, rows, cols)
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Write an index raster to a 32-bit float TIFF file
pub fn write_index_tiff<P: AsRef<Path>>(raster: &Raster<f64>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_index_tiff(raster, file)
}

/// Write an index raster to an in-memory 32-bit float TIFF
pub fn write_index_tiff_to_buffer(raster: &Raster<f64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_index_tiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_index_tiff<W: Write + Seek>(raster: &Raster<f64>, writer: W) -> Result<()> {
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Encode(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster.map(|v| v as f32).into_array().into_iter().collect();

    encoder
        .write_image::<Gray32Float>(cols as u32, rows as u32, &data)
        .map_err(|e| Error::Encode(format!("Cannot write TIFF image: {}", e)))?;

    Ok(())
}
