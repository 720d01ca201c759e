//! Raster data structures

mod element;
mod grid;
mod rgb;

pub use element::RasterElement;
pub use grid::Raster;
pub use rgb::RgbRaster;
