//! Single-band raster grid

use crate::error::{Error, Result};
use crate::raster::RasterElement;
use ndarray::{Array2, ArrayView2};

/// A single-band 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in row-major order. Index rasters
/// are `Raster<f64>`; decoded image bands are `Raster<f32>`.
///
/// # Example
///
/// ```ignore
/// use verileaf_core::Raster;
///
/// let raster = Raster::from_vec(vec![0.1, 0.2, 0.3, 0.4], 2, 2)?;
/// let value = raster.get(1, 0)?;
/// let cells = raster.into_array();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self { data: array })
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self { data }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Consume the raster, returning the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// Apply `f` to every cell, producing a new raster of the same shape
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U,
    {
        Raster {
            data: self.data.mapv(f),
        }
    }

    /// Number of undefined (NaN) cells
    pub fn undefined_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_undefined()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
        assert_eq!(raster.len(), 20_000);
    }

    #[test]
    fn test_raster_access() {
        let raster: Raster<f64> = Raster::filled(10, 10, 0.42);
        assert_eq!(raster.get(5, 5).unwrap(), 0.42);
        assert!(matches!(
            raster.get(10, 0),
            Err(Error::IndexOutOfBounds { row: 10, col: 0, rows: 10, cols: 10 })
        ));
        assert!(raster.get(0, 10).is_err());
    }

    #[test]
    fn test_into_array() {
        let r = Raster::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        let array = r.into_array();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[(1, 2)], 6.0);
        assert_eq!(Raster::from_array(array).get(0, 1).unwrap(), 2.0);
    }

    #[test]
    fn test_from_vec_length_check() {
        assert!(Raster::<f64>::from_vec(vec![0.0; 5], 2, 3).is_err());
        let r = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        assert_eq!(r.get(1, 0).unwrap(), 4.0);
    }

    #[test]
    fn test_map_and_undefined_count() {
        let r = Raster::from_vec(vec![0.0f64, 1.0, -1.0, 4.0], 2, 2).unwrap();
        let roots = r.map(|v: f64| v.sqrt());
        assert_eq!(roots.undefined_count(), 1);
        assert_eq!(roots.get(1, 1).unwrap(), 2.0);
    }
}
