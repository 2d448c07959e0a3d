//! The numerical engine facade.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rustfft::FftPlanner;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::DspError;
use crate::kalman::{self, KalmanState};
use crate::pca::{self, Pca};
use crate::peaks::{self, Peak};
use crate::savgol;
use crate::spectrum::{self, FrequencySpectrum};

/// Stateless over its inputs except for small named caches: per-stream
/// Kalman states and Savitzky-Golay kernels keyed by `(window, order)`.
///
/// Both caches are cleared by [`reset`](Self::reset) and
/// [`set_config`](Self::set_config); independent instances share nothing.
pub struct NumericalEngine {
    config: EngineConfig,
    fft_planner: FftPlanner<f32>,
    kalman_states: HashMap<String, KalmanState>,
    sg_cache: HashMap<(usize, usize), Vec<f32>>,
}

impl NumericalEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            fft_planner: FftPlanner::new(),
            kalman_states: HashMap::new(),
            sg_cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect on the next call; cached
    /// Kalman states and smoothing kernels are invalidated.
    pub fn set_config(&mut self, config: EngineConfig) {
        debug!(
            sample_rate = config.sample_rate,
            min_freq = config.min_freq,
            max_freq = config.max_freq,
            "engine reconfigured, caches cleared"
        );
        self.config = config;
        self.clear_caches();
    }

    /// Clear session-scoped state, keeping the configuration.
    pub fn reset(&mut self) {
        self.clear_caches();
    }

    fn clear_caches(&mut self) {
        self.kalman_states.clear();
        self.sg_cache.clear();
    }

    /// Windowed FFT analysis at the configured sample rate, with the
    /// dominant-frequency search restricted to the configured band.
    ///
    /// Requires at least 4 samples.
    pub fn spectral_analysis(&mut self, signal: &Array1<f32>) -> Result<FrequencySpectrum, DspError> {
        let (rate, lo, hi) = (
            self.config.sample_rate,
            self.config.min_freq,
            self.config.max_freq,
        );
        self.spectral_analysis_at(signal, rate, lo, hi)
    }

    /// Like [`spectral_analysis`](Self::spectral_analysis) but for a signal
    /// sampled at a different rate or searched over a different band, e.g.
    /// an RR-interval series resampled at 4 Hz.
    pub fn spectral_analysis_at(
        &mut self,
        signal: &Array1<f32>,
        sample_rate: f32,
        min_freq: f32,
        max_freq: f32,
    ) -> Result<FrequencySpectrum, DspError> {
        spectrum::analyze(
            &mut self.fft_planner,
            &self.config,
            signal,
            sample_rate,
            min_freq,
            max_freq,
        )
    }

    /// Scalar Kalman filter over `signal` for the named stream.
    ///
    /// State is created lazily on first use of `stream_key` and persists
    /// across calls. A singular innovation covariance clears the stream's
    /// state and raises [`DspError::SingularMatrix`].
    pub fn kalman_filter(
        &mut self,
        signal: &Array1<f32>,
        stream_key: &str,
    ) -> Result<Array1<f32>, DspError> {
        let mut state = self
            .kalman_states
            .get(stream_key)
            .cloned()
            .unwrap_or_default();

        match kalman::filter_signal(
            &mut state,
            signal,
            self.config.kalman_process_noise,
            self.config.kalman_measurement_noise,
        ) {
            Ok(out) => {
                self.kalman_states.insert(stream_key.to_string(), state);
                Ok(out)
            }
            Err(e) => {
                if matches!(e, DspError::SingularMatrix(_)) {
                    self.kalman_states.remove(stream_key);
                }
                Err(e)
            }
        }
    }

    /// Savitzky-Golay smoothing with cached kernels.
    ///
    /// `window_size` must be odd, `poly_order < window_size`, and
    /// `window_size <= signal.len()`.
    pub fn savitzky_golay(
        &mut self,
        signal: &Array1<f32>,
        window_size: usize,
        poly_order: usize,
    ) -> Result<Array1<f32>, DspError> {
        if window_size > signal.len() {
            return Err(DspError::InvalidParameter(format!(
                "window size {window_size} exceeds signal length {}",
                signal.len()
            )));
        }
        let coeffs = match self.sg_cache.get(&(window_size, poly_order)) {
            Some(c) => c.clone(),
            None => {
                let c = savgol::coefficients(window_size, poly_order)?;
                self.sg_cache.insert((window_size, poly_order), c.clone());
                c
            }
        };
        Ok(savgol::apply(signal, &coeffs))
    }

    /// Peak detection: Savitzky-Golay pre-smoothing, prominence and width
    /// scoring, then greedy spacing-constrained selection. Peaks come back
    /// sorted by ascending index.
    pub fn detect_peaks(&mut self, signal: &Array1<f32>) -> Result<Vec<Peak>, DspError> {
        let n = signal.len();
        if n < 3 {
            return Err(DspError::SignalTooShort { min: 3, got: n });
        }

        let peak_cfg = self.config.peaks.clone();
        let sample_rate = self.config.sample_rate;

        // Smoothing is best-effort: short signals are searched raw
        let smoothed = if peak_cfg.smooth_window <= n && peak_cfg.smooth_window >= 3 {
            self.savitzky_golay(signal, peak_cfg.smooth_window, peak_cfg.smooth_order)?
        } else {
            signal.clone()
        };

        Ok(peaks::find_peaks(&smoothed, &peak_cfg, sample_rate))
    }

    /// Principal-component analysis over `data` columns.
    pub fn principal_components(&self, data: &Array2<f32>) -> Result<Pca, DspError> {
        pca::principal_components(data)
    }
}

impl Default for NumericalEngine {
    fn default() -> Self {
        Self::new()
    }
}
