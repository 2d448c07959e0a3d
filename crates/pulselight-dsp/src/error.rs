//! Error types for the numerical engine.

use thiserror::Error;

/// Errors raised by [`crate::NumericalEngine`] operations.
///
/// Contract violations (bad parameters, empty input) raise immediately.
/// Data-quality shortfalls never surface here; those degrade to neutral
/// results with low confidence at the call sites.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DspError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("signal too short: need at least {min} samples, got {got}")]
    SignalTooShort { min: usize, got: usize },

    #[error("singular matrix in {0}")]
    SingularMatrix(String),
}
