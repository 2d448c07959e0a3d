//! Windowed FFT spectral analysis.
//!
//! Zero-pads to the next power of two so the planner takes the radix-2
//! butterfly path, keeps the positive-frequency half, and searches for the
//! dominant peak inside the configured physiological band only.

use ndarray::Array1;
use num_complex::Complex32;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::DspError;

/// Result of a spectral analysis pass. Recomputed per call, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencySpectrum {
    /// Bin center frequencies (Hz), positive half only.
    pub frequencies: Vec<f32>,
    /// Magnitude per bin.
    pub magnitudes: Vec<f32>,
    /// Phase per bin (radians).
    pub phases: Vec<f32>,
    /// Power spectral density per bin.
    pub power_spectral_density: Vec<f32>,
    /// Strongest in-band frequency (Hz), parabolically refined. Zero when
    /// the band holds no usable bins.
    pub dominant_frequency: f32,
    /// Frequencies found at integer multiples of the dominant (Hz).
    pub harmonics: Vec<f32>,
    /// Dominant-bin power over total power, in [0, 1].
    pub spectral_purity: f32,
    /// 10*log10(dominant power / mean non-harmonic power), dB.
    pub snr_db: f32,
}

impl FrequencySpectrum {
    /// Frequency resolution between adjacent bins (Hz).
    pub fn bin_resolution(&self) -> f32 {
        if self.frequencies.len() > 1 {
            self.frequencies[1] - self.frequencies[0]
        } else {
            0.0
        }
    }

    /// Total power integrated over `[lo, hi]` Hz.
    pub fn band_power(&self, lo: f32, hi: f32) -> f32 {
        self.frequencies
            .iter()
            .zip(self.power_spectral_density.iter())
            .filter(|(&f, _)| f >= lo && f <= hi)
            .map(|(_, &p)| p)
            .sum()
    }
}

/// Minimum input length for spectral analysis.
pub(crate) const MIN_SPECTRUM_LEN: usize = 4;

/// Half-width of a spectral peak's main lobe in bins.
const LOBE_BINS: usize = 2;

pub(crate) fn analyze(
    planner: &mut FftPlanner<f32>,
    cfg: &EngineConfig,
    signal: &Array1<f32>,
    sample_rate: f32,
    min_freq: f32,
    max_freq: f32,
) -> Result<FrequencySpectrum, DspError> {
    let n = signal.len();
    if n < MIN_SPECTRUM_LEN {
        return Err(DspError::SignalTooShort {
            min: MIN_SPECTRUM_LEN,
            got: n,
        });
    }
    if sample_rate <= 0.0 {
        return Err(DspError::InvalidParameter(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }

    // 1. Detrend and window
    let mean = signal.mean().unwrap_or(0.0);
    let window = cfg.window_coefficients(n);
    let window_power: f32 = window.iter().map(|w| w * w).sum();

    // 2. Zero-pad to the next power of two
    let padded = n.next_power_of_two();
    let mut buffer: Vec<Complex32> = Vec::with_capacity(padded);
    for (i, &s) in signal.iter().enumerate() {
        buffer.push(Complex32::new((s - mean) * window[i], 0.0));
    }
    buffer.resize(padded, Complex32::new(0.0, 0.0));

    // 3. Transform
    let fft = planner.plan_fft_forward(padded);
    fft.process(&mut buffer);

    // 4. Positive half
    let half = padded / 2;
    let bin_res = sample_rate / padded as f32;
    let mut frequencies = Vec::with_capacity(half);
    let mut magnitudes = Vec::with_capacity(half);
    let mut phases = Vec::with_capacity(half);
    let mut psd = Vec::with_capacity(half);
    let psd_norm = (sample_rate * window_power).max(f32::EPSILON);
    for (i, c) in buffer.iter().take(half).enumerate() {
        frequencies.push(i as f32 * bin_res);
        magnitudes.push(c.norm());
        phases.push(c.arg());
        psd.push(c.norm_sqr() / psd_norm);
    }

    // 5. Dominant peak inside the physiological band
    let min_bin = ((min_freq / bin_res).ceil() as usize).max(1);
    let max_bin = ((max_freq / bin_res).floor() as usize).min(half.saturating_sub(1));

    let mut dominant_frequency = 0.0;
    let mut harmonics = Vec::new();
    let mut spectral_purity = 0.0;
    let mut snr_db = 0.0;

    if min_bin <= max_bin {
        let power: Vec<f32> = buffer.iter().take(half).map(|c| c.norm_sqr()).collect();

        let mut peak_bin = min_bin;
        let mut peak_power = 0.0f32;
        for (i, &p) in power.iter().enumerate().take(max_bin + 1).skip(min_bin) {
            if p > peak_power {
                peak_power = p;
                peak_bin = i;
            }
        }

        if peak_power > 0.0 {
            dominant_frequency = refine_peak(&power, peak_bin) * bin_res;

            // Harmonics at integer multiples, within tolerance. A candidate
            // bin must carry a meaningful share of the fundamental's power,
            // or sidelobe leakage would register as a harmonic.
            let tol_bins = (cfg.harmonic_tolerance_hz / bin_res).ceil() as usize;
            let harmonic_floor = peak_power * 0.05;
            let mut harmonic_bins = vec![peak_bin];
            let mut k = 2usize;
            loop {
                let target = dominant_frequency * k as f32;
                let center = (target / bin_res).round() as usize;
                if center + 1 >= half {
                    break;
                }
                let lo = center.saturating_sub(tol_bins).max(1);
                let hi = (center + tol_bins).min(half - 1);
                let (best, best_p) = (lo..=hi)
                    .map(|i| (i, power[i]))
                    .fold((lo, 0.0f32), |acc, x| if x.1 > acc.1 { x } else { acc });
                if best_p > harmonic_floor {
                    harmonics.push(best as f32 * bin_res);
                    harmonic_bins.push(best);
                }
                k += 1;
            }

            // Dominant power spans the peak's main lobe (window spreads a
            // tone across adjacent bins), measured as peak bin +/- LOBE_BINS.
            let lobe = |center: usize| -> f32 {
                let lo = center.saturating_sub(LOBE_BINS).max(1);
                let hi = (center + LOBE_BINS).min(half - 1);
                power[lo..=hi].iter().sum()
            };
            let dominant_power = lobe(peak_bin);

            // Purity: dominant lobe over total (DC excluded)
            let total_power: f32 = power.iter().skip(1).sum();
            if total_power > 0.0 {
                spectral_purity = (dominant_power / total_power).clamp(0.0, 1.0);
            }

            // SNR: dominant over mean non-harmonic power. Each harmonic lobe
            // is excluded from the noise floor.
            let mut noise_sum = 0.0f32;
            let mut noise_count = 0usize;
            for i in 1..half {
                let near_harmonic = harmonic_bins
                    .iter()
                    .any(|&h| i >= h.saturating_sub(LOBE_BINS) && i <= h + LOBE_BINS);
                if !near_harmonic {
                    noise_sum += power[i];
                    noise_count += 1;
                }
            }
            if noise_count > 0 && noise_sum > 0.0 {
                let noise_mean = noise_sum / noise_count as f32;
                snr_db = 10.0 * (dominant_power / noise_mean).log10();
            }
        }
    }

    Ok(FrequencySpectrum {
        frequencies,
        magnitudes,
        phases,
        power_spectral_density: psd,
        dominant_frequency,
        harmonics,
        spectral_purity,
        snr_db,
    })
}

/// Parabolic interpolation around `bin` for sub-bin peak location.
fn refine_peak(power: &[f32], bin: usize) -> f32 {
    if bin == 0 || bin + 1 >= power.len() {
        return bin as f32;
    }
    let y_m1 = power[bin - 1];
    let y_0 = power[bin];
    let y_p1 = power[bin + 1];
    let denom = y_m1 - 2.0 * y_0 + y_p1;
    if denom.abs() > 1e-12 {
        let delta = 0.5 * (y_m1 - y_p1) / denom;
        if delta.is_finite() && delta.abs() <= 1.0 {
            return bin as f32 + delta;
        }
    }
    bin as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, fs: f32, secs: f32) -> Array1<f32> {
        let n = (fs * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / fs).sin())
            .collect()
    }

    #[test]
    fn test_dominant_frequency_of_sine() {
        let mut planner = FftPlanner::new();
        let cfg = EngineConfig::default();
        let signal = sine(1.2, 30.0, 8.0);

        let spec = analyze(&mut planner, &cfg, &signal, 30.0, 0.5, 4.0).unwrap();
        assert!(
            (spec.dominant_frequency - 1.2).abs() < 0.15,
            "expected ~1.2 Hz, got {}",
            spec.dominant_frequency
        );
        assert!(
            spec.spectral_purity > 0.8,
            "pure sine should have high purity, got {}",
            spec.spectral_purity
        );
        assert!(spec.snr_db > 10.0, "clean sine SNR too low: {}", spec.snr_db);
        assert!(
            spec.harmonics.is_empty(),
            "a pure tone has no harmonics, got {:?}",
            spec.harmonics
        );
    }

    #[test]
    fn test_too_short_signal_rejected() {
        let mut planner = FftPlanner::new();
        let cfg = EngineConfig::default();
        let signal = Array1::from(vec![1.0, 2.0, 3.0]);
        let err = analyze(&mut planner, &cfg, &signal, 30.0, 0.5, 4.0).unwrap_err();
        assert!(matches!(err, DspError::SignalTooShort { min: 4, got: 3 }));
    }

    #[test]
    fn test_positive_half_lengths_match() {
        let mut planner = FftPlanner::new();
        let cfg = EngineConfig::default();
        let signal = sine(1.0, 30.0, 3.0); // 90 samples -> padded to 128
        let spec = analyze(&mut planner, &cfg, &signal, 30.0, 0.5, 4.0).unwrap();
        assert_eq!(spec.frequencies.len(), 64);
        assert_eq!(spec.magnitudes.len(), 64);
        assert_eq!(spec.phases.len(), 64);
        assert_eq!(spec.power_spectral_density.len(), 64);
    }

    #[test]
    fn test_harmonics_of_pulse_like_signal() {
        // Fundamental + strong 2nd harmonic, like a real pulse waveform
        let fs = 30.0;
        let n = 512;
        let signal: Array1<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / fs;
                (2.0 * PI * 1.0 * t).sin() + 0.4 * (2.0 * PI * 2.0 * t).sin()
            })
            .collect();

        let mut planner = FftPlanner::new();
        let cfg = EngineConfig::default();
        let spec = analyze(&mut planner, &cfg, &signal, fs, 0.5, 4.0).unwrap();

        assert!((spec.dominant_frequency - 1.0).abs() < 0.1);
        assert!(
            spec.harmonics.iter().any(|&h| (h - 2.0).abs() < 0.15),
            "expected a harmonic near 2 Hz, got {:?}",
            spec.harmonics
        );
    }

    #[test]
    fn test_band_restriction_skips_out_of_band_peak() {
        // 0.2 Hz dominates globally but sits below the band
        let fs = 30.0;
        let n = 1024;
        let signal: Array1<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / fs;
                3.0 * (2.0 * PI * 0.2 * t).sin() + (2.0 * PI * 1.5 * t).sin()
            })
            .collect();

        let mut planner = FftPlanner::new();
        let cfg = EngineConfig::default();
        let spec = analyze(&mut planner, &cfg, &signal, fs, 0.5, 4.0).unwrap();
        assert!(
            (spec.dominant_frequency - 1.5).abs() < 0.1,
            "in-band peak should win, got {}",
            spec.dominant_frequency
        );
    }

    #[test]
    fn test_determinism() {
        let mut planner = FftPlanner::new();
        let cfg = EngineConfig::default();
        let signal = sine(1.3, 30.0, 5.0);
        let a = analyze(&mut planner, &cfg, &signal, 30.0, 0.5, 4.0).unwrap();
        let b = analyze(&mut planner, &cfg, &signal, 30.0, 0.5, 4.0).unwrap();
        assert_eq!(a.dominant_frequency, b.dominant_frequency);
        assert_eq!(a.magnitudes, b.magnitudes);
        assert_eq!(a.snr_db, b.snr_db);
    }
}
