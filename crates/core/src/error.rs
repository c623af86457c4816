//! Error types shared by every Tessera subsystem.
//!
//! One taxonomy covers the whole engine so callers and tests can assert on
//! the cause of a failure, not just on failure itself. Every error carries a
//! specific reason string distinguishing it from every other condition.

use thiserror::Error;

/// Errors surfaced by ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed input: mismatched arrays, percentages not summing to 100,
    /// zero amounts, rates out of range
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is not permitted to perform the attempted action
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Operation is invalid for the current state of the record
    #[error("state error: {0}")]
    State(String),

    /// Accumulated revenue, allowance, or balance too low
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// A mutating call was detected during another mutating call
    #[error("reentrant call: {0}")]
    Reentrancy(String),
}

impl Error {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization(reason.into())
    }

    pub fn state(reason: impl Into<String>) -> Self {
        Self::State(reason.into())
    }

    pub fn insufficient_funds(reason: impl Into<String>) -> Self {
        Self::InsufficientFunds(reason.into())
    }

    pub fn reentrancy(reason: impl Into<String>) -> Self {
        Self::Reentrancy(reason.into())
    }
}

/// Result type used across the engine
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_reason() {
        let err = Error::validation("percentages must sum to 100");
        assert_eq!(
            err.to_string(),
            "validation error: percentages must sum to 100"
        );

        let err = Error::insufficient_funds("nothing to withdraw");
        assert_eq!(err.to_string(), "insufficient funds: nothing to withdraw");
    }

    #[test]
    fn test_error_categories_are_distinguishable() {
        let errors = [
            Error::validation("a"),
            Error::authorization("a"),
            Error::state("a"),
            Error::insufficient_funds("a"),
            Error::reentrancy("a"),
        ];
        for (i, left) in errors.iter().enumerate() {
            for (j, right) in errors.iter().enumerate() {
                assert_eq!(i == j, left == right);
            }
        }
    }
}
