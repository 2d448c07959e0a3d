//! Photoplethysmographic signal extraction.
//!
//! Converts per-frame channel intensities into calibrated absorbance via
//! Beer-Lambert (`A = -log10(I / I0)`), splits AC/DC with a centered moving
//! average, and scores each sample's quality.
//!
//! The extractor is a one-way state machine per session:
//! `Calibrating` (accumulate the per-channel baseline over the first frames)
//! then `Active` (steady-state extraction). Only [`reset`] returns to
//! `Calibrating`.
//!
//! [`reset`]: SignalExtractor::reset

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pulselight_dsp::{EngineConfig, NumericalEngine};

use crate::error::SignalError;
use crate::types::{PpgSignal, PulseWaveform, RawFrame};
use crate::waveform;

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Frames accumulated before the baseline freezes.
    pub calibration_frames: usize,
    /// Centered moving-average width for the DC estimate (odd).
    pub dc_window: usize,
    /// Upper clamp for the pulsatility index (percent).
    pub max_pulsatility: f32,
    /// Intensity floor guarding the absorbance logarithm.
    pub min_intensity: f32,
    /// AC absorbance amplitude that maps to quality 1.0.
    pub quality_ac_scale: f32,
    /// Sample-to-sample absorbance delta treated as fully unstable.
    pub stability_scale: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            calibration_frames: 30, // ~1 s warm-up
            dc_window: 31,
            max_pulsatility: 20.0,
            min_intensity: 1e-3,
            quality_ac_scale: 5e-3,
            stability_scale: 0.05,
        }
    }
}

/// Per-channel reference intensity captured during warm-up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationBaseline {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

/// Extraction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractorState {
    Calibrating,
    Active,
}

/// Converts raw frames into a calibrated [`PpgSignal`].
pub struct SignalExtractor {
    config: ExtractorConfig,
    engine: NumericalEngine,
    state: ExtractorState,
    calib_sum: [f32; 3],
    calib_count: usize,
    baseline: Option<CalibrationBaseline>,
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        let engine_cfg = EngineConfig {
            sample_rate: config.sample_rate,
            ..EngineConfig::default()
        };
        Self {
            config,
            engine: NumericalEngine::with_config(engine_cfg),
            state: ExtractorState::Calibrating,
            calib_sum: [0.0; 3],
            calib_count: 0,
            baseline: None,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Replace the configuration; effective from the next call. The engine's
    /// cached filter state is invalidated, calibration progress is kept.
    pub fn set_config(&mut self, config: ExtractorConfig) {
        let engine_cfg = EngineConfig {
            sample_rate: config.sample_rate,
            ..self.engine.config().clone()
        };
        self.engine.set_config(engine_cfg);
        self.config = config;
    }

    pub fn state(&self) -> ExtractorState {
        self.state
    }

    /// The frozen baseline, once calibration completes.
    pub fn baseline(&self) -> Option<CalibrationBaseline> {
        self.baseline
    }

    /// Return to `Calibrating`, clearing the baseline and engine caches.
    /// Configuration is unaffected.
    pub fn reset(&mut self) {
        self.state = ExtractorState::Calibrating;
        self.calib_sum = [0.0; 3];
        self.calib_count = 0;
        self.baseline = None;
        self.engine.reset();
    }

    /// Extract a [`PpgSignal`] from `frames`, advancing calibration as
    /// needed. Every output series has exactly `frames.len()` samples;
    /// samples consumed for calibration come back zeroed with quality 0.
    pub fn extract(&mut self, frames: &[RawFrame]) -> Result<PpgSignal, SignalError> {
        if frames.is_empty() {
            return Err(SignalError::InsufficientFrames { min: 1, got: 0 });
        }

        let n = frames.len();
        let mut red_abs = vec![0.0f32; n];
        let mut green_abs = vec![0.0f32; n];
        let mut blue_abs = vec![0.0f32; n];
        let mut timestamps = Vec::with_capacity(n);
        // Index of the first sample extracted while Active
        let mut first_active = n;

        for (i, frame) in frames.iter().enumerate() {
            timestamps.push(frame.timestamp_ms);

            if self.state == ExtractorState::Calibrating {
                self.calib_sum[0] += frame.red;
                self.calib_sum[1] += frame.green;
                self.calib_sum[2] += frame.blue;
                self.calib_count += 1;
                if self.calib_count >= self.config.calibration_frames {
                    let denom = self.calib_count as f32;
                    self.baseline = Some(CalibrationBaseline {
                        red: self.calib_sum[0] / denom,
                        green: self.calib_sum[1] / denom,
                        blue: self.calib_sum[2] / denom,
                    });
                    self.state = ExtractorState::Active;
                    debug!(
                        frames = self.calib_count,
                        "calibration complete, baseline frozen"
                    );
                }
                continue;
            }

            // Active: Beer-Lambert absorbance against the frozen baseline
            let Some(base) = self.baseline else { continue };
            red_abs[i] = self.absorbance(frame.red, base.red);
            green_abs[i] = self.absorbance(frame.green, base.green);
            blue_abs[i] = self.absorbance(frame.blue, base.blue);
            if first_active == n {
                first_active = i;
            }
        }

        // AC/DC split over the active span of the primary channel
        let mut ac = vec![0.0f32; n];
        let mut dc = vec![0.0f32; n];
        if first_active < n {
            let (a, d) = ac_dc_split(&green_abs[first_active..], self.config.dc_window);
            ac[first_active..].copy_from_slice(&a);
            dc[first_active..].copy_from_slice(&d);
        }

        // Pulsatility from the relative-intensity domain: I/I0 = 10^(-A)
        // keeps DC near unity, so the ratio is well conditioned.
        let mut pulsatility = vec![0.0f32; n];
        let mut quality = vec![0.0f32; n];
        let rel: Vec<f32> = green_abs[first_active..]
            .iter()
            .map(|a| 10f32.powf(-a))
            .collect();
        let (rel_ac, rel_dc) = ac_dc_split(&rel, self.config.dc_window);
        for i in first_active..n {
            let j = i - first_active;
            let pi = (rel_ac[j].abs() / rel_dc[j].abs().max(f32::EPSILON)) * 100.0;
            pulsatility[i] = pi.clamp(0.0, self.config.max_pulsatility);

            let ac_q = (ac[i].abs() / self.config.quality_ac_scale).clamp(0.0, 1.0);
            let stability = if i > first_active {
                let delta = (green_abs[i] - green_abs[i - 1]).abs();
                (1.0 - delta / self.config.stability_scale).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let q = frames[i].quality;
            quality[i] = (ac_q
                * q.finger_confidence.clamp(0.0, 1.0)
                * q.overall_quality.clamp(0.0, 1.0)
                * stability)
                .clamp(0.0, 1.0);
        }

        Ok(PpgSignal {
            red_absorbance: red_abs,
            green_absorbance: green_abs,
            blue_absorbance: blue_abs,
            ac,
            dc,
            pulsatility,
            quality,
            sample_rate: self.config.sample_rate,
            timestamps_ms: timestamps,
        })
    }

    /// Characterize one representative pulse from an extracted signal.
    pub fn pulse_waveform(&mut self, signal: &PpgSignal) -> Result<PulseWaveform, SignalError> {
        waveform::extract(&mut self.engine, &Array1::from(signal.ac.clone()), signal.sample_rate)
    }

    fn absorbance(&self, intensity: f32, reference: f32) -> f32 {
        let i = intensity.max(self.config.min_intensity);
        let i0 = reference.max(self.config.min_intensity);
        -(i / i0).log10()
    }
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a series into baseline (centered moving average of `window`
/// samples, clamped odd) and pulsatile remainder.
pub fn ac_dc_split(series: &[f32], window: usize) -> (Vec<f32>, Vec<f32>) {
    let n = series.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let mut w = window.clamp(1, n);
    if w % 2 == 0 {
        w -= 1;
    }
    let half = w / 2;

    let mut dc = vec![0.0f32; n];
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(n - 1);
        let span = &series[lo..=hi];
        dc[i] = span.iter().sum::<f32>() / span.len() as f32;
    }
    let ac = series.iter().zip(dc.iter()).map(|(s, d)| s - d).collect();
    (ac, dc)
}
