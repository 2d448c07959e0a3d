//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Window function applied before the FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowFunction {
    /// No tapering
    Rectangular,
    /// Hann (raised cosine)
    Hann,
    /// Hamming - default, matches the rest of the pipeline
    Hamming,
    /// Blackman - strongest sidelobe suppression
    Blackman,
}

/// Configuration for peak detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakConfig {
    /// Minimum height as `mean + k*std` of the smoothed signal.
    pub height_k_std: f32,
    /// Minimum prominence as a multiple of the smoothed signal std.
    pub prominence_k_std: f32,
    /// Minimum spacing between kept peaks (seconds).
    pub min_distance_sec: f32,
    /// Savitzky-Golay pre-smoothing window (odd).
    pub smooth_window: usize,
    /// Savitzky-Golay pre-smoothing polynomial order.
    pub smooth_order: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            height_k_std: 0.3,
            prominence_k_std: 0.3,
            min_distance_sec: 0.35, // ~170 BPM refractory
            smooth_window: 7,
            smooth_order: 2,
        }
    }
}

/// Configuration for the numerical engine.
///
/// Changes applied via [`crate::NumericalEngine::set_config`] take effect on
/// the next call; filter-affecting changes invalidate cached Kalman states
/// and Savitzky-Golay coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// FFT window function.
    pub window: WindowFunction,
    /// Lower bound of the physiological band (Hz).
    pub min_freq: f32,
    /// Upper bound of the physiological band (Hz).
    pub max_freq: f32,
    /// Tolerance when matching harmonics to integer multiples (Hz).
    pub harmonic_tolerance_hz: f32,
    /// Kalman process noise variance.
    pub kalman_process_noise: f32,
    /// Kalman measurement noise variance.
    pub kalman_measurement_noise: f32,
    /// Peak detection parameters.
    pub peaks: PeakConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            window: WindowFunction::Hamming,
            min_freq: 0.5, // 30 BPM
            max_freq: 4.0, // 240 BPM
            harmonic_tolerance_hz: 0.1,
            kalman_process_noise: 1e-3,
            kalman_measurement_noise: 0.25,
            peaks: PeakConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Window coefficients of the configured type for length `n`.
    pub(crate) fn window_coefficients(&self, n: usize) -> Vec<f32> {
        use std::f32::consts::PI;
        if n <= 1 {
            return vec![1.0; n];
        }
        let m = (n - 1) as f32;
        (0..n)
            .map(|i| {
                let x = i as f32 / m;
                match self.window {
                    WindowFunction::Rectangular => 1.0,
                    WindowFunction::Hann => 0.5 - 0.5 * (2.0 * PI * x).cos(),
                    WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                    }
                }
            })
            .collect()
    }
}
