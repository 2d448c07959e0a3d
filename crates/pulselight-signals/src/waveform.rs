//! Single-pulse morphology extraction.
//!
//! Picks the most prominent beat from a pulse signal and walks its limbs:
//! onset/offset at 10-15% of peak height, 10-90% rise and fall times, the
//! dicrotic notch as the local minimum of the early descending limb, and the
//! diastolic peak after it.

use ndarray::Array1;

use pulselight_dsp::NumericalEngine;

use crate::error::SignalError;
use crate::types::PulseWaveform;

/// Fraction of peak height marking the pulse foot.
const FOOT_FRACTION: f32 = 0.125;
/// Portion of the descending limb searched for the dicrotic notch.
const NOTCH_SEARCH_FRACTION: f32 = 0.5;

pub(crate) fn extract(
    engine: &mut NumericalEngine,
    pulse: &Array1<f32>,
    sample_rate: f32,
) -> Result<PulseWaveform, SignalError> {
    let n = pulse.len();
    let min_len = sample_rate.max(1.0) as usize;
    if n < min_len {
        return Err(SignalError::SignalTooShort { min: min_len, got: n });
    }

    let peaks = engine.detect_peaks(pulse)?;
    let best_pos = peaks
        .iter()
        .enumerate()
        .max_by(|a, b| {
            a.1.prominence
                .partial_cmp(&b.1.prominence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .ok_or(SignalError::NoPeaksFound)?;

    let peak = peaks[best_pos].index;
    let peak_val = pulse[peak];

    // Beat boundaries: the neighboring detected peaks (or the signal edges),
    // with the feet at the minima in between. This steps over the dicrotic
    // notch, which is a local minimum but not a beat boundary.
    let left_bound = if best_pos > 0 {
        peaks[best_pos - 1].index
    } else {
        0
    };
    let right_bound = if best_pos + 1 < peaks.len() {
        peaks[best_pos + 1].index
    } else {
        n - 1
    };
    let left_foot = argmin(pulse, left_bound, peak);
    let right_foot = argmin(pulse, peak, right_bound);
    let foot_val = pulse[left_foot].min(pulse[right_foot]);
    let amplitude = peak_val - foot_val;
    if amplitude <= f32::EPSILON {
        return Err(SignalError::NoPeaksFound);
    }

    // Onset/offset where the pulse crosses the foot threshold
    let threshold = foot_val + FOOT_FRACTION * amplitude;
    let onset = cross_below(pulse, peak, left_foot, threshold, true);
    let offset = cross_below(pulse, peak, right_foot, threshold, false);

    // 10-90% limb timings
    let t10 = foot_val + 0.1 * amplitude;
    let t90 = foot_val + 0.9 * amplitude;
    let rise_lo = cross_below(pulse, peak, left_foot, t10, true);
    let rise_hi = cross_below(pulse, peak, left_foot, t90, true);
    let fall_hi = cross_below(pulse, peak, right_foot, t90, false);
    let fall_lo = cross_below(pulse, peak, right_foot, t10, false);
    let rise_time_sec = (rise_hi.saturating_sub(rise_lo)) as f32 / sample_rate;
    let fall_time_sec = (fall_lo.saturating_sub(fall_hi)) as f32 / sample_rate;

    // Dicrotic notch: first local minimum in the early descending limb,
    // followed by a local maximum (the diastolic peak) before the offset
    let search_end = (peak + ((offset - peak) as f32 * NOTCH_SEARCH_FRACTION) as usize)
        .min(offset)
        .min(n - 1);
    let mut dicrotic_notch = None;
    let mut diastolic_peak = None;
    for i in (peak + 1)..search_end {
        if pulse[i] <= pulse[i - 1] && pulse[i] < pulse[i + 1] {
            dicrotic_notch = Some(i);
            for j in (i + 1)..offset.min(n - 1) {
                if pulse[j] >= pulse[j - 1] && pulse[j] > pulse[j + 1] {
                    diastolic_peak = Some(j);
                    break;
                }
            }
            break;
        }
    }

    let augmentation_index = dicrotic_notch
        .map(|i| ((pulse[i] - foot_val) / amplitude).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    let reflection_index = diastolic_peak
        .map(|i| ((pulse[i] - foot_val) / amplitude).clamp(0.0, 1.0))
        .unwrap_or(0.0);

    Ok(PulseWaveform {
        systolic_peak: peak,
        dicrotic_notch,
        diastolic_peak,
        onset,
        offset,
        amplitude,
        width_sec: (offset.saturating_sub(onset)) as f32 / sample_rate,
        rise_time_sec,
        fall_time_sec,
        augmentation_index,
        reflection_index,
    })
}

/// Index of the minimum value in `pulse[lo..=hi]`.
fn argmin(pulse: &Array1<f32>, lo: usize, hi: usize) -> usize {
    let mut best = lo;
    for i in lo..=hi.min(pulse.len() - 1) {
        if pulse[i] < pulse[best] {
            best = i;
        }
    }
    best
}

/// Walk from `peak` toward `foot` and return the first index at or below
/// `level`. `leftward` selects the walking direction.
fn cross_below(
    pulse: &Array1<f32>,
    peak: usize,
    foot: usize,
    level: f32,
    leftward: bool,
) -> usize {
    if leftward {
        let mut i = peak;
        while i > foot {
            i -= 1;
            if pulse[i] <= level {
                return i;
            }
        }
        foot
    } else {
        let mut i = peak;
        while i < foot {
            i += 1;
            if pulse[i] <= level {
                return i;
            }
        }
        foot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    /// Pulse train with a secondary (dicrotic) bump on the descending limb.
    /// The bump overlaps the systolic decay so the notch stays well above
    /// the pulse foot, like a real PPG contour.
    fn pulse_train(n: usize, fs: f32, beat_hz: f32) -> Array1<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 / fs;
                let phase = (t * beat_hz).fract();
                let systolic = (-((phase - 0.15) / 0.1).powi(2)).exp();
                let reflected = 0.45 * (-((phase - 0.4) / 0.12).powi(2)).exp();
                systolic + reflected
            })
            .collect()
    }

    fn engine() -> NumericalEngine {
        NumericalEngine::new()
    }

    #[test]
    fn test_too_short_rejected() {
        let mut e = engine();
        let pulse: Array1<f32> = (0..10).map(|i| i as f32).collect();
        assert!(matches!(
            extract(&mut e, &pulse, 30.0),
            Err(SignalError::SignalTooShort { .. })
        ));
    }

    #[test]
    fn test_flat_signal_has_no_peaks() {
        let mut e = engine();
        let pulse = Array1::from(vec![1.0f32; 90]);
        assert!(matches!(
            extract(&mut e, &pulse, 30.0),
            Err(SignalError::NoPeaksFound)
        ));
    }

    #[test]
    fn test_morphology_of_synthetic_pulse() {
        let mut e = engine();
        let pulse = pulse_train(150, 30.0, 1.25);
        let wf = extract(&mut e, &pulse, 30.0).unwrap();

        assert!(wf.amplitude > 0.5, "amplitude {}", wf.amplitude);
        assert!(wf.onset < wf.systolic_peak);
        assert!(wf.offset > wf.systolic_peak);
        assert!(wf.rise_time_sec > 0.0);
        assert!(wf.fall_time_sec > 0.0);
        assert!(wf.width_sec > 0.1 && wf.width_sec < 1.0, "width {}", wf.width_sec);
        assert!((0.0..=1.0).contains(&wf.augmentation_index));
        assert!((0.0..=1.0).contains(&wf.reflection_index));
    }

    #[test]
    fn test_dicrotic_notch_found_on_reflected_wave() {
        let mut e = engine();
        let pulse = pulse_train(300, 30.0, 1.0);
        let wf = extract(&mut e, &pulse, 30.0).unwrap();

        let notch = wf.dicrotic_notch.expect("reflected wave should produce a notch");
        assert!(notch > wf.systolic_peak);
        let dia = wf.diastolic_peak.expect("diastolic peak should follow the notch");
        assert!(dia > notch);
        assert!(wf.reflection_index > 0.1, "reflection {}", wf.reflection_index);
    }

    #[test]
    fn test_smooth_sine_has_no_notch() {
        let mut e = engine();
        let pulse: Array1<f32> = (0..120)
            .map(|i| (2.0 * PI * 1.2 * i as f32 / 30.0).sin())
            .collect();
        let wf = extract(&mut e, &pulse, 30.0).unwrap();
        assert!(wf.dicrotic_notch.is_none());
        assert_eq!(wf.augmentation_index, 0.0);
    }
}
