//! Error types for nxpk-common.

use thiserror::Error;

/// Common error type for low-level reads.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Position lies beyond the end of the buffer.
    #[error("position {position} is outside a buffer of {len} bytes")]
    OutOfBounds { position: usize, len: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
