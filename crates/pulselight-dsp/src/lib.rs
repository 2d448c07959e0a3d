//! # pulselight-dsp
//!
//! Numerical engine for photoplethysmographic signal analysis.
//!
//! This crate provides:
//! - **Spectral analysis**: windowed FFT with band-limited dominant-frequency
//!   search, harmonic location, spectral purity and SNR
//! - **Adaptive filtering**: keyed scalar Kalman filters with per-stream state
//! - **Savitzky-Golay smoothing**: cached least-squares convolution kernels
//! - **Peak detection**: prominence/width-based peak finding with spacing
//!   constraints
//! - **Dimensionality reduction**: principal-component analysis
//!
//! ## Example
//!
//! ```ignore
//! use pulselight_dsp::{NumericalEngine, EngineConfig};
//! use ndarray::Array1;
//!
//! let mut engine = NumericalEngine::new();
//! let signal: Array1<f32> = /* pulse samples at 30 Hz */;
//! let spectrum = engine.spectral_analysis(&signal)?;
//! println!("dominant: {:.2} Hz, purity {:.2}", spectrum.dominant_frequency, spectrum.spectral_purity);
//! ```

mod config;
mod engine;
mod error;
mod kalman;
mod pca;
mod peaks;
mod savgol;
mod spectrum;

pub use config::{EngineConfig, PeakConfig, WindowFunction};
pub use engine::NumericalEngine;
pub use error::DspError;
pub use kalman::KalmanState;
pub use pca::Pca;
pub use peaks::Peak;
pub use spectrum::FrequencySpectrum;
