//! Error types for the used-equipment economy core.
//!
//! Every request handler in [`crate::transaction`] returns a [`CoreResult`];
//! no [`CoreError`] is ever allowed to propagate out of a handler uncaught —
//! the transaction layer converts it into a `TransactionResponse` with
//! `success = false` before anything reaches the caller.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// The taxonomy of failure kinds a request handler or background tick can
/// produce. None of these are fatal: every variant is recoverable by the
/// caller retrying, correcting input, or simply observing the response.
#[derive(Debug)]
pub enum CoreError {
    /// The connection issuing the request does not own the referenced farm.
    Unauthorized { farm_id: i32 },

    /// A numeric field was NaN, infinite, or outside its documented bound.
    InvalidParameter(String),

    /// A variable-length wire array exceeded its cap. The caller is expected
    /// to have already drained the oversized record from the stream before
    /// constructing this error (see [`crate::wire`]).
    ResourceCap(String),

    /// The farm's wallet does not hold the funds required for the request.
    InsufficientFunds { required: i64, available: i64 },

    /// The requested term/amount exceeds what the farm's credit rating
    /// allows.
    IneligibleCredit { min_score_required: u16 },

    /// A referenced deal, listing, vehicle, or land id is unknown.
    NotFound(String),

    /// The target record exists but is not in a state that accepts this
    /// request (deal not active, listing locked, cache hit, search queue
    /// full, ...).
    InvalidState(String),

    /// The request conflicts with existing state (land already owned,
    /// already leased by this farm, duplicate external id, ...).
    Conflict(String),

    /// Failed to read or write a snapshot/config file.
    Io(io::Error),

    /// Failed to (de)serialize a snapshot or config payload.
    Serialize(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Unauthorized { farm_id } => {
                write!(f, "connection does not own farm {farm_id}")
            }
            CoreError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            CoreError::ResourceCap(msg) => write!(f, "resource cap exceeded: {msg}"),
            CoreError::InsufficientFunds { required, available } => {
                write!(f, "insufficient funds: required {required}, available {available}")
            }
            CoreError::IneligibleCredit { min_score_required } => {
                write!(f, "credit score below required minimum {min_score_required}")
            }
            CoreError::NotFound(what) => write!(f, "not found: {what}"),
            CoreError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            CoreError::Conflict(msg) => write!(f, "conflict: {msg}"),
            CoreError::Io(e) => write!(f, "I/O error: {e}"),
            CoreError::Serialize(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CoreError {
    fn from(err: io::Error) -> Self {
        CoreError::Io(err)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialize(err.to_string())
    }
}

/// Type alias for `Result` with [`CoreError`].
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = CoreError::Unauthorized { farm_id: 7 };
        assert!(e.to_string().contains('7'));

        let e = CoreError::InsufficientFunds { required: 100, available: 40 };
        assert!(e.to_string().contains("100"));
        assert!(e.to_string().contains("40"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }
}
