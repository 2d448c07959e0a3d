//! Exploratory glucose and lipid estimates.
//!
//! These are speculative empirical regressions over waveform and perfusion
//! features. There is no spectroscopic hardware behind them, so confidence
//! is hard-capped low and every estimate is flagged `exploratory`. Treat
//! them as research outputs, never as contractual measurements.

use crate::types::{MetabolicEstimate, PulseWaveform};

/// Hard ceiling on metabolic confidence.
const MAX_CONFIDENCE: f32 = 0.1;
/// Minimum signal quality before an estimate is emitted at all.
const MIN_QUALITY: f32 = 0.2;

pub(crate) fn estimate(
    waveform: Option<&PulseWaveform>,
    hr_bpm: f32,
    perfusion_index: f32,
    mean_quality: f32,
) -> Option<MetabolicEstimate> {
    let wf = waveform?;
    if hr_bpm <= 0.0 || mean_quality < MIN_QUALITY {
        return None;
    }

    let glucose = (78.0 + 40.0 * wf.augmentation_index + 0.2 * (hr_bpm - 70.0)
        - 1.5 * (perfusion_index - 1.0))
        .clamp(60.0, 160.0);
    let cholesterol =
        (165.0 + 60.0 * wf.reflection_index + 0.3 * (hr_bpm - 70.0)).clamp(120.0, 260.0);

    Some(MetabolicEstimate {
        glucose_mg_dl: glucose,
        total_cholesterol_mg_dl: cholesterol,
        confidence: (MAX_CONFIDENCE * mean_quality).min(MAX_CONFIDENCE),
        exploratory: true,
    })
}
