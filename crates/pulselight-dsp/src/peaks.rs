//! Prominence-based peak detection.
//!
//! Local maxima are scored by prominence (drop to the higher flanking
//! minimum) and half-prominence width, filtered against height/prominence
//! floors, then kept greedily by descending prominence under a minimum
//! spacing constraint.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::PeakConfig;

/// A detected peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Sample index of the maximum.
    pub index: usize,
    /// Signal value at the maximum.
    pub height: f32,
    /// Drop from the peak to the higher of its two flanking minima.
    pub prominence: f32,
    /// Width in samples at half prominence.
    pub width: f32,
}

/// Find peaks in an (already smoothed) signal. Output is sorted by index.
pub(crate) fn find_peaks(signal: &Array1<f32>, cfg: &PeakConfig, sample_rate: f32) -> Vec<Peak> {
    let n = signal.len();
    if n < 3 {
        return Vec::new();
    }

    let mean = signal.mean().unwrap_or(0.0);
    let std = signal
        .mapv(|x| (x - mean).powi(2))
        .mean()
        .unwrap_or(0.0)
        .sqrt();
    let min_height = mean + cfg.height_k_std * std;
    let min_prominence = cfg.prominence_k_std * std;
    let min_dist = ((cfg.min_distance_sec * sample_rate).round() as usize).max(1);

    // Local maxima (>= on the left tolerates short plateaus)
    let mut candidates = Vec::new();
    for i in 1..n - 1 {
        if signal[i] >= signal[i - 1] && signal[i] > signal[i + 1] && signal[i] >= min_height {
            let prominence = prominence_at(signal, i);
            if prominence >= min_prominence && prominence > 0.0 {
                let width = width_at(signal, i, prominence);
                candidates.push(Peak {
                    index: i,
                    height: signal[i],
                    prominence,
                    width,
                });
            }
        }
    }

    // Greedy selection: highest prominence first, enforce spacing
    candidates.sort_by(|a, b| {
        b.prominence
            .partial_cmp(&a.prominence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<Peak> = Vec::new();
    for cand in candidates {
        let clashes = kept
            .iter()
            .any(|k| cand.index.abs_diff(k.index) < min_dist);
        if !clashes {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|p| p.index);
    kept
}

/// Prominence: walk outward until a strictly higher sample (or the signal
/// edge), take the minimum on each side, drop to the higher of the two.
fn prominence_at(signal: &Array1<f32>, peak: usize) -> f32 {
    let h = signal[peak];

    let mut left_min = h;
    let mut i = peak;
    while i > 0 {
        i -= 1;
        if signal[i] > h {
            break;
        }
        left_min = left_min.min(signal[i]);
    }

    let mut right_min = h;
    let mut i = peak;
    while i + 1 < signal.len() {
        i += 1;
        if signal[i] > h {
            break;
        }
        right_min = right_min.min(signal[i]);
    }

    h - left_min.max(right_min)
}

/// Width in samples where the signal crosses `height - prominence/2`,
/// linearly interpolated on both flanks.
fn width_at(signal: &Array1<f32>, peak: usize, prominence: f32) -> f32 {
    let level = signal[peak] - prominence * 0.5;

    let mut left = peak as f32;
    for i in (0..peak).rev() {
        if signal[i] <= level {
            let span = signal[i + 1] - signal[i];
            let frac = if span.abs() > f32::EPSILON {
                (level - signal[i]) / span
            } else {
                0.0
            };
            left = i as f32 + frac;
            break;
        }
        left = i as f32;
    }

    let mut right = peak as f32;
    for i in (peak + 1)..signal.len() {
        if signal[i] <= level {
            let span = signal[i - 1] - signal[i];
            let frac = if span.abs() > f32::EPSILON {
                (level - signal[i]) / span
            } else {
                0.0
            };
            right = i as f32 - frac;
            break;
        }
        right = i as f32;
    }

    (right - left).max(0.0)
}
