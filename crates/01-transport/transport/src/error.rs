//! Error handling helpers for the transport crate.
//!
//! The transport layer intentionally keeps its error surface small: capacity
//! validation at construction. Runtime queue operations hand rejected
//! elements back or block rather than propagating errors.

use std::fmt;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

/// Errors surfaced by low-level transport helpers.
#[derive(Debug)]
pub enum TransportError {
    /// Requested queue capacity is below the minimum of one element.
    InvalidCapacity { requested: usize },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidCapacity { requested } => {
                write!(f, "queue capacity {requested} must be at least 1 element")
            }
        }
    }
}

impl std::error::Error for TransportError {}
