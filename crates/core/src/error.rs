//! Error types for VeriLeaf

use thiserror::Error;

/// Main error type for VeriLeaf operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Malformed or unsupported image bytes.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Re-encoding a raster for transport failed.
    #[error("Encode error: {0}")]
    Encode(String),

    /// One or both input images were not supplied.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A reduction produced a non-finite value.
    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the
    /// pipeline itself.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Decode(_)
                | Error::MissingInput(_)
                | Error::InvalidDimensions { .. }
                | Error::SizeMismatch { .. }
                | Error::InvalidParameter { .. }
                | Error::SessionNotFound(_)
        )
    }
}

/// Result type alias for VeriLeaf operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_classification() {
        assert!(Error::Decode("bad header".into()).is_input_error());
        assert!(Error::MissingInput("before".into()).is_input_error());
        assert!(Error::SessionNotFound("abc".into()).is_input_error());
        assert!(!Error::Encode("jpeg".into()).is_input_error());
        assert!(!Error::Computation("nan".into()).is_input_error());
    }

    #[test]
    fn test_display() {
        let e = Error::SizeMismatch { er: 2, ec: 3, ar: 4, ac: 5 };
        assert_eq!(e.to_string(), "Raster size mismatch: expected (2, 3), got (4, 5)");
    }
}
