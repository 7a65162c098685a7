//! Error types for blockstat-integral
//!
//! Precondition violations fail fast with a typed error; arithmetic
//! degeneracies (zero-variance correlation windows) are NOT errors and
//! propagate as NaN/infinity per IEEE semantics.

use blockstat_core::SampleFormat;
use thiserror::Error;

/// Errors that can occur in windowed-statistics operations
#[derive(Debug, Error)]
pub enum StatError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] blockstat_core::Error),

    /// Unsupported sample format for this operation
    #[error("unsupported sample format: expected {expected}, got {}", .actual.name())]
    UnsupportedFormat {
        /// Expected format description
        expected: &'static str,
        /// Actual format of the offending raster
        actual: SampleFormat,
    },

    /// Correlation queried before any offset was established
    #[error("no offset set: call set_offset before querying correlation")]
    OffsetNotSet,

    /// Incompatible raster sizes
    #[error("incompatible raster sizes: {0}x{1} vs {2}x{3}")]
    SizeMismatch(u32, u32, u32, u32),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for windowed-statistics operations
pub type StatResult<T> = Result<T, StatError>;
