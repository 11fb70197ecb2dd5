//! Engine-wide error taxonomy.
//!
//! Every fallible operation in the crate returns [`EngineError`]. The first
//! six variants are deterministic validation failures: they are raised before
//! any state is touched, and retrying the identical request will fail again.
//! `ConcurrencyConflict` is the only transient variant.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The paying bucket holds less than the requested amount. No balance
    /// was modified.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// A bet or amount falls outside the accepted window for the operation.
    #[error("amount out of range, accepted {min}..={max}")]
    OutOfRange { min: u64, max: u64 },

    /// An intent arrived for a (player, surface) pair with no live session.
    #[error("no active session for this player and surface")]
    NoActiveSession,

    /// A live session already exists for this (player, surface) pair.
    #[error("a session is already active for this player and surface")]
    SessionAlreadyActive,

    /// The intent is not valid for the session's current state.
    #[error("invalid action for session state {0}")]
    InvalidActionForState(String),

    /// The requested catalog item has no remaining stock for the requested
    /// day, or is not listed in that day's catalog at all.
    #[error("out of stock: {0}")]
    OutOfStock(String),

    /// Two operations raced on the same entity and the retry budget ran out.
    #[error("concurrent modification conflict, retry the request")]
    ConcurrencyConflict,

    /// The session idled past its per-game window and was evicted.
    #[error("session expired after idling past its timeout")]
    SessionExpired,

    /// An internal invariant failed (arithmetic overflow, corrupt session
    /// context). The triggering request is aborted; any balance it reserved
    /// has been restored by compensation.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl EngineError {
    /// Stable machine-readable code for the rendering layer. These strings
    /// are part of the public contract and never change.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            EngineError::OutOfRange { .. } => "OUT_OF_RANGE",
            EngineError::NoActiveSession => "NO_ACTIVE_SESSION",
            EngineError::SessionAlreadyActive => "SESSION_ALREADY_ACTIVE",
            EngineError::InvalidActionForState(_) => "INVALID_ACTION_FOR_STATE",
            EngineError::OutOfStock(_) => "OUT_OF_STOCK",
            EngineError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            EngineError::SessionExpired => "SESSION_EXPIRED",
            EngineError::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }

    /// Whether retrying the identical request can ever succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ConcurrencyConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            EngineError::InsufficientFunds("wallet".into()).code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            EngineError::OutOfRange { min: 100, max: 500_000 }.code(),
            "OUT_OF_RANGE"
        );
        assert_eq!(EngineError::NoActiveSession.code(), "NO_ACTIVE_SESSION");
        assert_eq!(EngineError::SessionExpired.code(), "SESSION_EXPIRED");
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(EngineError::ConcurrencyConflict.is_retryable());
        assert!(!EngineError::NoActiveSession.is_retryable());
        assert!(!EngineError::OutOfStock("Paper".into()).is_retryable());
    }

    #[test]
    fn test_display_carries_bounds() {
        let msg = EngineError::OutOfRange { min: 50, max: 100_000 }.to_string();
        assert!(msg.contains("50"));
        assert!(msg.contains("100000"));
    }
}
