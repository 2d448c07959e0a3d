//! Keyed scalar Kalman filtering.
//!
//! Each logical stream ("heart_rate", "peak_detection", ...) owns one
//! lazily-created [`KalmanState`] that persists across calls until the engine
//! is reset or reconfigured.

use ndarray::Array1;

use crate::error::DspError;

/// Per-stream filter state: scalar estimate and covariance.
#[derive(Debug, Clone)]
pub struct KalmanState {
    /// Current estimate.
    pub x: f32,
    /// Estimate covariance.
    pub p: f32,
    initialized: bool,
}

impl Default for KalmanState {
    fn default() -> Self {
        Self {
            x: 0.0,
            // High starting uncertainty, collapses after a few updates
            p: 1.0,
            initialized: false,
        }
    }
}

/// Run the filter over `signal`, mutating `state` in place.
///
/// Per sample: predict (covariance grows by process noise `q`), then update
/// (innovation, gain, posterior) against measurement noise `r`. A non-finite
/// or collapsed innovation covariance is unrecoverable for the stream.
pub(crate) fn filter_signal(
    state: &mut KalmanState,
    signal: &Array1<f32>,
    q: f32,
    r: f32,
) -> Result<Array1<f32>, DspError> {
    if signal.is_empty() {
        return Err(DspError::InvalidInput("empty signal".into()));
    }

    let mut out = Array1::zeros(signal.len());
    for (i, &z) in signal.iter().enumerate() {
        if !state.initialized {
            state.x = z;
            state.p = 1.0;
            state.initialized = true;
            out[i] = z;
            continue;
        }

        // Predict
        let x_pred = state.x;
        let p_pred = state.p + q;

        // Update
        let s = p_pred + r;
        if !s.is_finite() || s <= f32::EPSILON {
            return Err(DspError::SingularMatrix(
                "kalman innovation covariance".into(),
            ));
        }
        let gain = p_pred / s;
        let innovation = z - x_pred;
        state.x = x_pred + gain * innovation;
        state.p = (1.0 - gain) * p_pred;
        out[i] = state.x;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn variance(x: &Array1<f32>) -> f32 {
        let mean = x.mean().unwrap_or(0.0);
        x.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0)
    }

    #[test]
    fn test_noise_variance_reduced() {
        // Constant level with deterministic oscillatory noise
        let n = 300;
        let noisy: Array1<f32> = (0..n)
            .map(|i| 10.0 + 0.5 * (2.0 * PI * 11.0 * i as f32 / 30.0).sin())
            .collect();

        let mut state = KalmanState::default();
        let filtered = filter_signal(&mut state, &noisy, 1e-3, 0.5).unwrap();

        assert!(
            variance(&filtered) < variance(&noisy),
            "filtering must strictly reduce variance: {} vs {}",
            variance(&filtered),
            variance(&noisy)
        );
    }

    #[test]
    fn test_state_persists_across_calls() {
        let signal = Array1::from(vec![5.0; 50]);
        let mut state = KalmanState::default();
        filter_signal(&mut state, &signal, 1e-3, 0.25).unwrap();
        let x_after_first = state.x;
        assert!((x_after_first - 5.0).abs() < 0.1);

        // Second call starts from the converged estimate, not from scratch
        let step = Array1::from(vec![6.0; 1]);
        let out = filter_signal(&mut state, &step, 1e-3, 0.25).unwrap();
        assert!(out[0] > 5.0 && out[0] < 6.0, "partial update expected, got {}", out[0]);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut state = KalmanState::default();
        let err = filter_signal(&mut state, &Array1::zeros(0), 1e-3, 0.25).unwrap_err();
        assert!(matches!(err, DspError::InvalidInput(_)));
    }

    #[test]
    fn test_collapsed_covariance_raises_singular() {
        let mut state = KalmanState::default();
        let signal = Array1::from(vec![1.0, 2.0, 3.0]);
        let err = filter_signal(&mut state, &signal, f32::NAN, 0.25).unwrap_err();
        assert!(matches!(err, DspError::SingularMatrix(_)));
    }
}
