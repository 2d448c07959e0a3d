//! # pulselight-signals
//!
//! Fingertip camera photoplethysmography for vital-sign estimation.
//!
//! A capture layer presses a fingertip against the camera lens and delivers
//! per-frame color intensities; this crate turns them into biometric
//! estimates:
//!
//! - [`SignalExtractor`] - calibrated optical-absorbance extraction with
//!   AC/DC separation, pulsatility, and per-sample quality
//! - [`VitalsEstimator`] - heart rate, SpO2, blood pressure, HRV,
//!   arrhythmia screening, respiration, and exploratory metabolic estimates
//! - [`StreamingBeatDetector`] - one-sample-at-a-time heartbeat detection
//!   for low-latency live feedback
//!
//! ## Example
//!
//! ```ignore
//! use pulselight_signals::{SignalExtractor, VitalsEstimator};
//!
//! let mut extractor = SignalExtractor::new();
//! let mut estimator = VitalsEstimator::new();
//!
//! let ppg = extractor.extract(&frames)?;
//! let vitals = estimator.compute(&ppg)?;
//! println!("HR {:.0} BPM (conf {:.2})", vitals.heart_rate_bpm, vitals.heart_rate_confidence);
//! ```

mod error;
mod extractor;
mod streaming;
mod types;
mod vitals;
mod waveform;

pub use error::SignalError;
pub use extractor::{ac_dc_split, CalibrationBaseline, ExtractorConfig, ExtractorState, SignalExtractor};
pub use streaming::{BeatDetectorConfig, BeatUpdate, DetectorState, StreamingBeatDetector};
pub use types::{
    ArrhythmiaAssessment, ArrhythmiaKind, BiometricResult, BloodPressure, HrvMetrics,
    MetabolicEstimate, PpgSignal, PulseWaveform, RawFrame, UpstreamQuality,
};
pub use vitals::{
    BloodPressureConfig, IrSource, ModeledIrSource, SpO2Config, VitalsConfig, VitalsEstimator,
};

// Re-export the engine so callers can drive it directly
pub use pulselight_dsp::{
    DspError, EngineConfig, FrequencySpectrum, NumericalEngine, Peak, PeakConfig, WindowFunction,
};
