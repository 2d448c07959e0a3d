//! Respiration rate from baseline wander.
//!
//! Breathing modulates tissue blood volume, which shows up as slow wander
//! in the DC series. A spectral peak search over 0.1-0.5 Hz (6-30
//! breaths/min) recovers it.

use ndarray::Array1;

use pulselight_dsp::NumericalEngine;

const RESP_BAND: (f32, f32) = (0.1, 0.5);
/// Minimum samples for a meaningful respiration spectrum (~4 s at 30 fps
/// would be far too short; breathing needs several cycles).
const MIN_SAMPLES: usize = 128;
/// Logistic confidence curve midpoint and steepness (dB).
const SNR_MID_DB: f32 = 5.0;
const SNR_K: f32 = 0.6;

/// Estimate breaths/min and a confidence in [0, 1]. Fails closed to
/// (0, 0) on short or wander-free input.
pub(crate) fn estimate(
    engine: &mut NumericalEngine,
    dc: &[f32],
    sample_rate: f32,
) -> (f32, f32) {
    if dc.len() < MIN_SAMPLES {
        return (0.0, 0.0);
    }

    let series = Array1::from(dc.to_vec());
    let spectrum =
        match engine.spectral_analysis_at(&series, sample_rate, RESP_BAND.0, RESP_BAND.1) {
            Ok(s) => s,
            Err(_) => return (0.0, 0.0),
        };

    if spectrum.dominant_frequency <= 0.0 {
        return (0.0, 0.0);
    }

    let brpm = spectrum.dominant_frequency * 60.0;
    let confidence = 1.0 / (1.0 + (-SNR_K * (spectrum.snr_db - SNR_MID_DB)).exp());
    (brpm, confidence.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_breathing_wander_recovered() {
        // 15 breaths/min = 0.25 Hz wander over 40 s
        let fs = 30.0;
        let dc: Vec<f32> = (0..1200)
            .map(|i| 0.02 + 0.005 * (2.0 * PI * 0.25 * i as f32 / fs).sin())
            .collect();
        let mut engine = NumericalEngine::new();
        let (brpm, conf) = estimate(&mut engine, &dc, fs);
        assert!((brpm - 15.0).abs() < 2.0, "got {brpm} brpm");
        assert!(conf > 0.5, "clean wander should be confident, got {conf}");
    }

    #[test]
    fn test_short_input_fails_closed() {
        let mut engine = NumericalEngine::new();
        let (brpm, conf) = estimate(&mut engine, &[0.01; 60], 30.0);
        assert_eq!(brpm, 0.0);
        assert_eq!(conf, 0.0);
    }
}
