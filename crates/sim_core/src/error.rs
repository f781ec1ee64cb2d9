//! Error taxonomy for the simulation core.
//!
//! Validation and transient failures are data, not exceptions: they are reported
//! through `CommandResult::error` or handled locally by resetting the affected
//! state. Only consistency failures (invariant violations that indicate a
//! programmer error) are modeled as a hard [`SimError`] that aborts the current
//! command or tick.

use thiserror::Error;

/// Errors that can abort the current command or tick.
///
/// `Validation` is reserved for callers that want to route a failure through
/// `Result` instead of `CommandResult` (e.g. manager-level helpers used outside
/// the command executor). `Consistency` always indicates a bug: an entity or
/// side-state record that the caller's own invariants guaranteed would exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("consistency violation: {0}")]
    Consistency(String),
}

impl SimError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        let err = Self::Consistency(msg.into());
        tracing::error!(%err, "consistency violation");
        err
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, SimError::Consistency(_))
    }
}

pub type SimResult<T> = Result<T, SimError>;
