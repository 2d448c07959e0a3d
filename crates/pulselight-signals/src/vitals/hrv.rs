//! Heart-rate variability metrics.
//!
//! Time-domain statistics over successive RR differences, plus LF/HF band
//! powers from the evenly-resampled RR series spectrum.

use ndarray::Array1;

use pulselight_dsp::NumericalEngine;

use crate::types::HrvMetrics;

/// Resampling rate for the RR tachogram (Hz).
const TACHOGRAM_RATE: f32 = 4.0;
const LF_BAND: (f32, f32) = (0.04, 0.15);
const HF_BAND: (f32, f32) = (0.15, 0.4);
/// Minimum resampled tachogram length for a usable spectrum.
const MIN_TACHOGRAM_LEN: usize = 16;

/// Compute HRV metrics and a confidence in [0, 1]. Fails closed to zeroed
/// metrics when fewer than 3 intervals are available.
pub(crate) fn estimate(engine: &mut NumericalEngine, rr_ms: &[f32]) -> (HrvMetrics, f32) {
    if rr_ms.len() < 3 {
        return (HrvMetrics::default(), 0.0);
    }

    let n = rr_ms.len() as f32;
    let mean_rr = rr_ms.iter().sum::<f32>() / n;
    let sdnn = (rr_ms.iter().map(|r| (r - mean_rr).powi(2)).sum::<f32>() / n).sqrt();

    let mut diff_sq_sum = 0.0f32;
    let mut nn50 = 0usize;
    for w in rr_ms.windows(2) {
        let d = w[1] - w[0];
        diff_sq_sum += d * d;
        if d.abs() > 50.0 {
            nn50 += 1;
        }
    }
    let diff_count = rr_ms.len() - 1;
    let rmssd = (diff_sq_sum / diff_count as f32).sqrt();
    let pnn50 = 100.0 * nn50 as f32 / diff_count as f32;

    let (lf_power, hf_power) = band_powers(engine, rr_ms);
    let lf_hf_ratio = if hf_power > f32::EPSILON {
        lf_power / hf_power
    } else {
        0.0
    };

    let metrics = HrvMetrics {
        mean_rr_ms: mean_rr,
        sdnn_ms: sdnn,
        rmssd_ms: rmssd,
        pnn50_pct: pnn50,
        lf_power,
        hf_power,
        lf_hf_ratio,
    };

    // More beats, more trust; saturates at 10 intervals
    let confidence = (rr_ms.len() as f32 / 10.0).clamp(0.0, 1.0);
    (metrics, confidence)
}

/// LF/HF powers from the RR tachogram, linearly resampled at 4 Hz and
/// analyzed through the engine's FFT. Short windows yield zero power.
fn band_powers(engine: &mut NumericalEngine, rr_ms: &[f32]) -> (f32, f32) {
    // Beat times from cumulative intervals (seconds)
    let mut beat_t = Vec::with_capacity(rr_ms.len());
    let mut acc = 0.0f32;
    for &rr in rr_ms {
        acc += rr / 1000.0;
        beat_t.push(acc);
    }
    let duration = acc;
    let samples = (duration * TACHOGRAM_RATE) as usize;
    if samples < MIN_TACHOGRAM_LEN {
        return (0.0, 0.0);
    }

    // Linear interpolation of RR(t) on the even grid
    let mut tachogram = Vec::with_capacity(samples);
    let mut k = 0usize;
    for i in 0..samples {
        let t = i as f32 / TACHOGRAM_RATE;
        while k + 1 < beat_t.len() && beat_t[k + 1] < t {
            k += 1;
        }
        let value = if k + 1 < beat_t.len() {
            let t0 = beat_t[k];
            let t1 = beat_t[k + 1];
            let frac = ((t - t0) / (t1 - t0).max(1e-6)).clamp(0.0, 1.0);
            rr_ms[k] + frac * (rr_ms[k + 1] - rr_ms[k])
        } else {
            rr_ms[rr_ms.len() - 1]
        };
        tachogram.push(value);
    }

    match engine.spectral_analysis_at(
        &Array1::from(tachogram),
        TACHOGRAM_RATE,
        LF_BAND.0,
        HF_BAND.1,
    ) {
        Ok(spectrum) => (
            spectrum.band_power(LF_BAND.0, LF_BAND.1),
            spectrum.band_power(HF_BAND.0, HF_BAND.1),
        ),
        Err(_) => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_too_few_intervals_fail_closed() {
        let mut engine = NumericalEngine::new();
        let (metrics, conf) = estimate(&mut engine, &[800.0, 810.0]);
        assert_eq!(metrics.sdnn_ms, 0.0);
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn test_steady_rhythm_has_low_variability() {
        let mut engine = NumericalEngine::new();
        let (metrics, conf) = estimate(&mut engine, &[800.0; 20]);
        assert_relative_eq!(metrics.mean_rr_ms, 800.0, epsilon = 1e-3);
        assert_relative_eq!(metrics.sdnn_ms, 0.0, epsilon = 1e-3);
        assert_relative_eq!(metrics.rmssd_ms, 0.0, epsilon = 1e-3);
        assert_eq!(metrics.pnn50_pct, 0.0);
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn test_alternating_rhythm_metrics() {
        // 750/850 alternation: every successive difference is 100 ms
        let rr: Vec<f32> = (0..20)
            .map(|i| if i % 2 == 0 { 750.0 } else { 850.0 })
            .collect();
        let mut engine = NumericalEngine::new();
        let (metrics, _) = estimate(&mut engine, &rr);
        assert_relative_eq!(metrics.mean_rr_ms, 800.0, epsilon = 1e-3);
        assert_relative_eq!(metrics.rmssd_ms, 100.0, epsilon = 0.1);
        assert_relative_eq!(metrics.sdnn_ms, 50.0, epsilon = 0.1);
        assert_eq!(metrics.pnn50_pct, 100.0);
    }

    #[test]
    fn test_respiratory_modulation_shows_in_hf() {
        // RR modulated at ~0.3 Hz (HF band): one full swing every ~4 beats
        let rr: Vec<f32> = (0..60)
            .map(|i| 800.0 + 60.0 * (2.0 * std::f32::consts::PI * 0.3 * 0.8 * i as f32).sin())
            .collect();
        let mut engine = NumericalEngine::new();
        let (metrics, _) = estimate(&mut engine, &rr);
        assert!(
            metrics.hf_power > metrics.lf_power,
            "HF should dominate: lf={} hf={}",
            metrics.lf_power,
            metrics.hf_power
        );
    }
}
