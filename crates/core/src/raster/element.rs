//! Raster element trait for generic cell values

use num_traits::Zero;
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Bounds the cell types to plain numeric values that can be shared across
/// worker threads.
pub trait RasterElement: Copy + Debug + PartialEq + Zero + Send + Sync + 'static {
    /// Whether this value is undefined (NaN)
    fn is_undefined(&self) -> bool;
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn is_undefined(&self) -> bool {
                self.is_nan()
            }
        }
    };
}

impl_raster_element_float!(f32);
impl_raster_element_float!(f64);
