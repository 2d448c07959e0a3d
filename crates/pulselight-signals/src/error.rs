//! Error types for extraction and estimation.

use pulselight_dsp::DspError;
use thiserror::Error;

/// Errors raised by the extraction and estimation pipeline.
///
/// These are contract violations; data-quality shortfalls (too few beats,
/// low SNR, still calibrating) degrade to neutral values with low confidence
/// instead, so a missing beat never takes down a live pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("insufficient frames: need at least {min}, got {got}")]
    InsufficientFrames { min: usize, got: usize },

    #[error("signal too short: need at least {min} samples, got {got}")]
    SignalTooShort { min: usize, got: usize },

    #[error("no peaks found in signal")]
    NoPeaksFound,

    #[error(transparent)]
    Dsp(#[from] DspError),
}
