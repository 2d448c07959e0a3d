//! Heuristic blood-pressure estimation from pulse-wave timing.
//!
//! A pulse-wave-velocity proxy comes from the systolic upstroke time; the
//! linear mapping `SBP = c1*PWV + c2*HR + c3` (and the diastolic analogue)
//! is an empirical heuristic, so its constants live in configuration.

use serde::{Deserialize, Serialize};

use crate::types::{BloodPressure, PulseWaveform};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodPressureConfig {
    /// Scale turning inverse rise time into the PWV proxy.
    pub pwv_scale: f32,
    pub sbp_pwv_coeff: f32,
    pub sbp_hr_coeff: f32,
    pub sbp_offset: f32,
    pub dbp_pwv_coeff: f32,
    pub dbp_hr_coeff: f32,
    pub dbp_offset: f32,
}

impl Default for BloodPressureConfig {
    fn default() -> Self {
        Self {
            pwv_scale: 1.0,
            sbp_pwv_coeff: 4.0,
            sbp_hr_coeff: 0.5,
            sbp_offset: 60.0,
            dbp_pwv_coeff: 2.5,
            dbp_hr_coeff: 0.3,
            dbp_offset: 40.0,
        }
    }
}

const SBP_RANGE: (f32, f32) = (90.0, 180.0);
const DBP_RANGE: (f32, f32) = (50.0, 120.0);
/// Minimum systolic-over-diastolic gap (mmHg).
const MIN_PULSE_PRESSURE: f32 = 10.0;
/// Rise times below this are measurement noise at camera frame rates.
const MIN_RISE_SEC: f32 = 0.02;

/// Estimate blood pressure and a confidence in [0, 1]. Fails closed to
/// zeroed pressures with zero confidence when no waveform is available.
pub(crate) fn estimate(
    waveform: Option<&PulseWaveform>,
    hr_bpm: f32,
    cfg: &BloodPressureConfig,
) -> (BloodPressure, f32) {
    let Some(wf) = waveform else {
        return (
            BloodPressure {
                systolic: 0.0,
                diastolic: 0.0,
            },
            0.0,
        );
    };
    if hr_bpm <= 0.0 || wf.rise_time_sec <= 0.0 {
        return (
            BloodPressure {
                systolic: 0.0,
                diastolic: 0.0,
            },
            0.0,
        );
    }

    let pwv = cfg.pwv_scale / wf.rise_time_sec.max(MIN_RISE_SEC);

    let systolic = (cfg.sbp_pwv_coeff * pwv + cfg.sbp_hr_coeff * hr_bpm + cfg.sbp_offset)
        .clamp(SBP_RANGE.0, SBP_RANGE.1);
    let mut diastolic = (cfg.dbp_pwv_coeff * pwv + cfg.dbp_hr_coeff * hr_bpm + cfg.dbp_offset)
        .clamp(DBP_RANGE.0, DBP_RANGE.1);
    if diastolic >= systolic - MIN_PULSE_PRESSURE {
        diastolic = systolic - MIN_PULSE_PRESSURE;
    }

    // A cuffless single-site heuristic never deserves more than modest trust
    let confidence = 0.3;

    (
        BloodPressure {
            systolic,
            diastolic,
        },
        confidence,
    )
}
