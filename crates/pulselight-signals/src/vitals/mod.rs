//! Derived-vitals estimation over an extracted PPG signal.
//!
//! Pure functions over the signal plus the engine's named caches; every
//! estimator returns a confidence in [0, 1] and fails closed to neutral
//! values on data-quality shortfalls. Only empty or too-short input raises.

mod arrhythmia;
mod blood_pressure;
mod heart_rate;
mod hrv;
mod metabolic;
mod respiration;
mod spo2;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pulselight_dsp::{EngineConfig, NumericalEngine};

pub use blood_pressure::BloodPressureConfig;
pub use spo2::{IrSource, ModeledIrSource, SpO2Config};

use crate::error::SignalError;
use crate::types::{BiometricResult, PpgSignal};
use crate::waveform;

/// Accepted beat-to-beat interval band (ms). Outside lies measurement
/// noise, not physiology.
const MIN_RR_MS: f32 = 300.0;
const MAX_RR_MS: f32 = 1500.0;

/// Estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsConfig {
    /// Expected sample rate of incoming signals (Hz).
    pub sample_rate: f32,
    pub spo2: SpO2Config,
    pub blood_pressure: BloodPressureConfig,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            spo2: SpO2Config::default(),
            blood_pressure: BloodPressureConfig::default(),
        }
    }
}

/// Computes a [`BiometricResult`] snapshot from a [`PpgSignal`].
pub struct VitalsEstimator {
    config: VitalsConfig,
    engine: NumericalEngine,
    ir_source: Box<dyn IrSource>,
}

impl VitalsEstimator {
    pub fn new() -> Self {
        Self::with_config(VitalsConfig::default())
    }

    pub fn with_config(config: VitalsConfig) -> Self {
        let engine_cfg = EngineConfig {
            sample_rate: config.sample_rate,
            ..EngineConfig::default()
        };
        Self {
            config,
            engine: NumericalEngine::with_config(engine_cfg),
            ir_source: Box::new(ModeledIrSource::default()),
        }
    }

    /// Swap the infrared source, e.g. for hardware with a real IR channel.
    pub fn with_ir_source(mut self, source: Box<dyn IrSource>) -> Self {
        self.ir_source = source;
        self
    }

    pub fn config(&self) -> &VitalsConfig {
        &self.config
    }

    /// Replace the configuration; effective from the next call. Cached
    /// engine filter state is invalidated.
    pub fn set_config(&mut self, config: VitalsConfig) {
        let engine_cfg = EngineConfig {
            sample_rate: config.sample_rate,
            ..self.engine.config().clone()
        };
        self.engine.set_config(engine_cfg);
        self.config = config;
    }

    /// Clear the engine's cached filter states. Configuration stays.
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Compute the full vitals snapshot.
    ///
    /// Raises only on empty (`InsufficientFrames`) or too-short
    /// (`SignalTooShort`) input; everything else degrades through
    /// per-field confidence.
    pub fn compute(&mut self, signal: &PpgSignal) -> Result<BiometricResult, SignalError> {
        if signal.is_empty() {
            return Err(SignalError::InsufficientFrames { min: 1, got: 0 });
        }
        if signal.len() < 4 {
            return Err(SignalError::SignalTooShort {
                min: 4,
                got: signal.len(),
            });
        }

        let fs = signal.sample_rate;
        let ac = Array1::from(signal.ac.clone());

        // Spectral view of the pulse signal over the engine's band
        let (band_lo, band_hi) = {
            let cfg = self.engine.config();
            (cfg.min_freq, cfg.max_freq)
        };
        let spectrum = self.engine.spectral_analysis_at(&ac, fs, band_lo, band_hi)?;

        // Beat-to-beat intervals, gated to the physiological band
        let peaks = self.engine.detect_peaks(&ac).unwrap_or_default();
        let rr_ms: Vec<f32> = peaks
            .windows(2)
            .map(|w| (w[1].index - w[0].index) as f32 * 1000.0 / fs)
            .filter(|rr| (MIN_RR_MS..=MAX_RR_MS).contains(rr))
            .collect();

        let hr = heart_rate::estimate(&rr_ms, &spectrum);
        let (hrv_metrics, hrv_confidence) = hrv::estimate(&mut self.engine, &rr_ms);

        // Morphology is optional: a noisy window without one clean beat
        // still produces rate estimates
        let wf = waveform::extract(&mut self.engine, &ac, fs).ok();

        let (spo2_percent, spo2_confidence) =
            spo2::estimate(signal, self.ir_source.as_ref(), &self.config.spo2);
        let (blood_pressure, blood_pressure_confidence) =
            blood_pressure::estimate(wf.as_ref(), hr.bpm, &self.config.blood_pressure);
        let arrhythmia = arrhythmia::classify(hr.bpm, &hrv_metrics, &rr_ms);
        let (respiration_brpm, respiration_confidence) =
            respiration::estimate(&mut self.engine, &signal.dc, fs);

        let perfusion_index = signal.perfusion_index();
        let metabolic =
            metabolic::estimate(wf.as_ref(), hr.bpm, perfusion_index, signal.mean_quality());

        debug!(
            hr = hr.bpm,
            hr_conf = hr.confidence,
            spo2 = spo2_percent,
            beats = rr_ms.len() + 1,
            "vitals computed"
        );

        Ok(BiometricResult {
            heart_rate_bpm: hr.bpm,
            heart_rate_confidence: hr.confidence,
            spo2_percent,
            spo2_confidence,
            blood_pressure,
            blood_pressure_confidence,
            hrv: hrv_metrics,
            hrv_confidence,
            arrhythmia,
            perfusion_index,
            respiration_brpm,
            respiration_confidence,
            metabolic,
            window_start_ms: signal.timestamps_ms.first().copied().unwrap_or(0),
            window_end_ms: signal.timestamps_ms.last().copied().unwrap_or(0),
        })
    }
}

impl Default for VitalsEstimator {
    fn default() -> Self {
        Self::new()
    }
}
