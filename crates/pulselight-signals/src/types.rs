//! Shared data model for the extraction and estimation pipeline.

use serde::{Deserialize, Serialize};

/// Quality metrics handed down by the capture layer alongside each frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpstreamQuality {
    /// Finger-presence confidence in [0, 1].
    pub finger_confidence: f32,
    /// Overall frame quality in [0, 1] (exposure, focus, saturation).
    pub overall_quality: f32,
    /// Capture-side SNR estimate (dB).
    pub snr_db: f32,
}

impl Default for UpstreamQuality {
    fn default() -> Self {
        Self {
            finger_confidence: 1.0,
            overall_quality: 1.0,
            snr_db: 0.0,
        }
    }
}

/// One capture tick: mean intensity per color channel plus upstream quality.
/// Produced externally, consumed once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawFrame {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    /// Capture timestamp in milliseconds.
    pub timestamp_ms: i64,
    pub quality: UpstreamQuality,
}

impl RawFrame {
    pub fn new(red: f32, green: f32, blue: f32, timestamp_ms: i64) -> Self {
        Self {
            red,
            green,
            blue,
            timestamp_ms,
            quality: UpstreamQuality::default(),
        }
    }

    /// Build a frame from raw per-pixel channel buffers by averaging them.
    pub fn from_pixels(
        red: &[f32],
        green: &[f32],
        blue: &[f32],
        timestamp_ms: i64,
        quality: UpstreamQuality,
    ) -> Self {
        let mean = |px: &[f32]| -> f32 {
            if px.is_empty() {
                0.0
            } else {
                px.iter().sum::<f32>() / px.len() as f32
            }
        };
        Self {
            red: mean(red),
            green: mean(green),
            blue: mean(blue),
            timestamp_ms,
            quality,
        }
    }
}

/// Extracted photoplethysmographic signal.
///
/// All series are parallel, time-aligned, and exactly as long as the input
/// frame slice. Quality values are in [0, 1]; pulsatility is clamped to a
/// physiological band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PpgSignal {
    pub red_absorbance: Vec<f32>,
    pub green_absorbance: Vec<f32>,
    pub blue_absorbance: Vec<f32>,
    /// Pulsatile component of the primary (green) absorbance.
    pub ac: Vec<f32>,
    /// Baseline component of the primary (green) absorbance.
    pub dc: Vec<f32>,
    /// Pulsatility index per sample (percent).
    pub pulsatility: Vec<f32>,
    /// Composite per-sample quality in [0, 1].
    pub quality: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Capture timestamps, one per sample.
    pub timestamps_ms: Vec<i64>,
}

impl PpgSignal {
    pub fn len(&self) -> usize {
        self.ac.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ac.is_empty()
    }

    /// Mean of the per-sample quality series.
    pub fn mean_quality(&self) -> f32 {
        if self.quality.is_empty() {
            0.0
        } else {
            self.quality.iter().sum::<f32>() / self.quality.len() as f32
        }
    }

    /// Mean pulsatility over samples with non-zero quality.
    pub fn perfusion_index(&self) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for (pi, &q) in self.pulsatility.iter().zip(self.quality.iter()) {
            if q > 0.0 {
                sum += pi;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

/// Morphology of one representative pulse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseWaveform {
    /// Index of the systolic peak within the analyzed signal.
    pub systolic_peak: usize,
    /// Index of the dicrotic notch, when the descending limb shows one.
    pub dicrotic_notch: Option<usize>,
    /// Index of the diastolic peak following the notch.
    pub diastolic_peak: Option<usize>,
    /// Pulse onset index (ascending-limb foot).
    pub onset: usize,
    /// Pulse offset index (descending-limb return to baseline).
    pub offset: usize,
    /// Peak amplitude above the pulse foot.
    pub amplitude: f32,
    /// Onset-to-offset duration (seconds).
    pub width_sec: f32,
    /// 10-90% ascending-limb duration (seconds).
    pub rise_time_sec: f32,
    /// 90-10% descending-limb duration (seconds).
    pub fall_time_sec: f32,
    /// Notch height over pulse amplitude, in [0, 1]; 0 without a notch.
    pub augmentation_index: f32,
    /// Diastolic-peak height over pulse amplitude, in [0, 1]; 0 without one.
    pub reflection_index: f32,
}

/// Systolic/diastolic pressure estimate (mmHg).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: f32,
    pub diastolic: f32,
}

/// Time- and frequency-domain heart-rate variability metrics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HrvMetrics {
    pub mean_rr_ms: f32,
    pub sdnn_ms: f32,
    pub rmssd_ms: f32,
    /// Percentage of successive RR differences above 50 ms.
    pub pnn50_pct: f32,
    /// Power in the 0.04-0.15 Hz band of the RR series.
    pub lf_power: f32,
    /// Power in the 0.15-0.4 Hz band of the RR series.
    pub hf_power: f32,
    pub lf_hf_ratio: f32,
}

/// Closed set of rhythm classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrhythmiaKind {
    None,
    Bradycardia,
    Tachycardia,
    AtrialFibrillationLike,
    PrematureBeatsLike,
    SinusArrhythmia,
}

/// Rhythm assessment derived from HR and HRV features.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArrhythmiaAssessment {
    pub kind: ArrhythmiaKind,
    /// Severity in [0, 1].
    pub severity: f32,
    /// Weighted risk score in [0, 100].
    pub risk_score: f32,
}

/// Exploratory metabolic estimates. These are speculative empirical
/// regressions without spectroscopic hardware behind them; confidence is
/// capped low and `exploratory` is always true.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetabolicEstimate {
    pub glucose_mg_dl: f32,
    pub total_cholesterol_mg_dl: f32,
    pub confidence: f32,
    pub exploratory: bool,
}

/// Aggregate vital-signs snapshot. Immutable once produced; the next
/// computation supersedes it rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiometricResult {
    pub heart_rate_bpm: f32,
    pub heart_rate_confidence: f32,

    pub spo2_percent: f32,
    pub spo2_confidence: f32,

    pub blood_pressure: BloodPressure,
    pub blood_pressure_confidence: f32,

    pub hrv: HrvMetrics,
    pub hrv_confidence: f32,

    pub arrhythmia: ArrhythmiaAssessment,

    /// Mean pulsatility index over the analyzed window (percent).
    pub perfusion_index: f32,

    pub respiration_brpm: f32,
    pub respiration_confidence: f32,

    /// Present only when the window supported waveform analysis.
    pub metabolic: Option<MetabolicEstimate>,

    /// First and last capture timestamps of the analyzed window.
    pub window_start_ms: i64,
    pub window_end_ms: i64,
}
