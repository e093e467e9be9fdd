//! Error types for the core data model.

use thiserror::Error;

/// Errors raised while building grids, images and transformations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A size that a grid, image or transformation cannot represent.
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// A parameter of a transformation family is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two grids that must agree do not.
    #[error("Size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Nothing is stored in the image pool under the requested key.
    #[error("No image available in data pool under '{0}'")]
    MissingPoolEntry(String),

    /// A pool loader failed to produce its image.
    #[error("Load error: {0}")]
    Load(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid size error.
    pub fn invalid_size(msg: impl Into<String>) -> Self {
        Self::InvalidSize(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a load error.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Create a size mismatch error from two grid extents.
    pub fn size_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::SizeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
