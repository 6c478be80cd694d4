//! Error types for the weave engine.
//!
//! The per-substep collision kernel never fails. Errors come from the
//! boundaries that populate its buffers.

use thiserror::Error;

/// Unified error type for the weave engine.
#[derive(Debug, Error)]
pub enum WeaveError {
    /// Particle buffers are malformed or inconsistent.
    #[error("Invalid particle buffer: {0}")]
    InvalidBuffer(String),

    /// Shape keyframes or topology are inconsistent.
    #[error("Invalid collision shape: {0}")]
    InvalidShape(String),

    /// More shapes than a shape mask can address.
    #[error("Too many {kind}: {count} (maximum {max})")]
    CapacityExceeded {
        kind: &'static str,
        count: usize,
        max: usize,
    },

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for `Result<T, WeaveError>`.
pub type WeaveResult<T> = Result<T, WeaveError>;
