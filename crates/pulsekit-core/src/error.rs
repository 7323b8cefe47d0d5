//! Error types for the pulse protocol core.

use thiserror::Error;

/// Errors raised by the pulse protocol core.
///
/// Only configuration mistakes and invalid encode requests are errors.
/// Malformed *input* pulses are decode noise and never raise; the affected
/// state machine simply stays put or falls back to idle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A bit-field or buffer operation outside its declared bounds, or a
    /// malformed component configuration. These are programming errors and
    /// should be surfaced immediately, not retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An encoder was asked to encode a message that violates the target
    /// protocol's structural constraints (missing or out-of-range fields).
    #[error("bad message: {0}")]
    BadMessage(String),
}

/// Result type alias for pulse protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
