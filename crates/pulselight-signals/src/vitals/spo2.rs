//! SpO2 estimation via the ratio of ratios.
//!
//! `R = (AC_red/DC_red) / (AC_ir/DC_ir)`, mapped through the empirical
//! calibration `SpO2 = a - b*R` and clamped to [70, 100].
//!
//! There is no infrared sensor on a camera: the IR series is modeled as a
//! linear combination of the visible channels behind the [`IrSource`]
//! trait, so a build with a real IR path swaps the source and nothing else.

use serde::{Deserialize, Serialize};

use crate::extractor::ac_dc_split;
use crate::types::PpgSignal;

/// Calibration constants for the ratio-of-ratios mapping. The corpus of
/// empirical curves disagrees on exact values, so they are configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpO2Config {
    /// Intercept of `SpO2 = a - b*R`.
    pub cal_a: f32,
    /// Slope of `SpO2 = a - b*R`.
    pub cal_b: f32,
    /// Moving-average width for the per-channel AC/DC split.
    pub dc_window: usize,
    /// R values outside this band are treated as implausible.
    pub plausible_r: (f32, f32),
}

impl Default for SpO2Config {
    fn default() -> Self {
        Self {
            cal_a: 110.0,
            cal_b: 25.0,
            dc_window: 31,
            plausible_r: (0.3, 3.0),
        }
    }
}

/// Source of the infrared absorbance series.
pub trait IrSource {
    fn ir_absorbance(&self, signal: &PpgSignal) -> Vec<f32>;
}

/// Models IR as a weighted mix of the visible channels, favoring green
/// (the strongest camera PPG channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeledIrSource {
    pub weights: [f32; 3],
}

impl Default for ModeledIrSource {
    fn default() -> Self {
        Self {
            weights: [0.3, 0.5, 0.2],
        }
    }
}

impl IrSource for ModeledIrSource {
    fn ir_absorbance(&self, signal: &PpgSignal) -> Vec<f32> {
        let [wr, wg, wb] = self.weights;
        signal
            .red_absorbance
            .iter()
            .zip(signal.green_absorbance.iter())
            .zip(signal.blue_absorbance.iter())
            .map(|((r, g), b)| wr * r + wg * g + wb * b)
            .collect()
    }
}

/// Estimate SpO2 percent and a confidence in [0, 1].
///
/// The output is always within [70, 100], whatever the AC/DC ratios do;
/// degenerate inputs only collapse the confidence.
pub(crate) fn estimate(signal: &PpgSignal, ir: &dyn IrSource, cfg: &SpO2Config) -> (f32, f32) {
    const EPS: f32 = 1e-6;

    let ir_abs = ir.ir_absorbance(signal);

    let red_ratio = perfusion_ratio(&signal.red_absorbance, cfg.dc_window);
    let ir_ratio = perfusion_ratio(&ir_abs, cfg.dc_window);

    let degenerate = red_ratio < EPS || ir_ratio < EPS;
    let r = red_ratio.max(EPS) / ir_ratio.max(EPS);
    let spo2 = (cfg.cal_a - cfg.cal_b * r).clamp(70.0, 100.0);

    let mut confidence = if degenerate {
        0.0
    } else {
        signal.mean_quality().clamp(0.0, 1.0)
    };
    let (r_lo, r_hi) = cfg.plausible_r;
    if r < r_lo || r > r_hi {
        confidence *= 0.2;
    }

    (spo2, confidence)
}

/// AC-over-DC amplitude ratio of a channel, computed in the
/// relative-intensity domain (`I/I0 = 10^-A`) where DC sits near unity.
fn perfusion_ratio(absorbance: &[f32], dc_window: usize) -> f32 {
    if absorbance.is_empty() {
        return 0.0;
    }
    let rel: Vec<f32> = absorbance.iter().map(|a| 10f32.powf(-a)).collect();
    let (ac, dc) = ac_dc_split(&rel, dc_window);

    let ac_rms = (ac.iter().map(|v| v * v).sum::<f32>() / ac.len() as f32).sqrt();
    let dc_mean = dc.iter().map(|v| v.abs()).sum::<f32>() / dc.len() as f32;
    if dc_mean <= f32::EPSILON {
        return 0.0;
    }
    ac_rms / dc_mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn signal_with(red: Vec<f32>, green: Vec<f32>, blue: Vec<f32>) -> PpgSignal {
        let n = red.len();
        PpgSignal {
            red_absorbance: red,
            green_absorbance: green,
            blue_absorbance: blue,
            ac: vec![0.0; n],
            dc: vec![0.0; n],
            pulsatility: vec![1.0; n],
            quality: vec![0.8; n],
            sample_rate: 30.0,
            timestamps_ms: (0..n as i64).map(|i| i * 33).collect(),
        }
    }

    fn pulsing_absorbance(n: usize, depth: f32) -> Vec<f32> {
        (0..n)
            .map(|i| depth * (2.0 * PI * 1.25 * i as f32 / 30.0).sin())
            .collect()
    }

    #[test]
    fn test_output_always_in_bounds() {
        // Pathological combinations, including flat (DC-only) channels
        let cases = vec![
            signal_with(vec![0.0; 90], vec![0.0; 90], vec![0.0; 90]),
            signal_with(pulsing_absorbance(90, 0.5), vec![0.0; 90], vec![0.0; 90]),
            signal_with(vec![0.0; 90], pulsing_absorbance(90, 0.5), vec![0.0; 90]),
            signal_with(
                pulsing_absorbance(90, 3.0),
                pulsing_absorbance(90, 1e-8),
                vec![0.0; 90],
            ),
        ];
        let ir = ModeledIrSource::default();
        for signal in cases {
            let (spo2, conf) = estimate(&signal, &ir, &SpO2Config::default());
            assert!((70.0..=100.0).contains(&spo2), "spo2 {spo2} out of bounds");
            assert!((0.0..=1.0).contains(&conf));
        }
    }

    #[test]
    fn test_flat_input_has_zero_confidence() {
        let signal = signal_with(vec![0.0; 90], vec![0.0; 90], vec![0.0; 90]);
        let (_, conf) = estimate(&signal, &ModeledIrSource::default(), &SpO2Config::default());
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn test_balanced_modulation_gives_plausible_value() {
        // Comparable modulation depth on every channel puts R near 1
        let signal = signal_with(
            pulsing_absorbance(150, 0.01),
            pulsing_absorbance(150, 0.01),
            pulsing_absorbance(150, 0.01),
        );
        let (spo2, conf) = estimate(&signal, &ModeledIrSource::default(), &SpO2Config::default());
        assert!((80.0..=95.0).contains(&spo2), "got {spo2}");
        assert!(conf > 0.5);
    }

    #[test]
    fn test_deeper_red_modulation_lowers_spo2() {
        let shallow = signal_with(
            pulsing_absorbance(150, 0.005),
            pulsing_absorbance(150, 0.01),
            pulsing_absorbance(150, 0.01),
        );
        let deep = signal_with(
            pulsing_absorbance(150, 0.02),
            pulsing_absorbance(150, 0.01),
            pulsing_absorbance(150, 0.01),
        );
        let ir = ModeledIrSource::default();
        let cfg = SpO2Config::default();
        let (hi, _) = estimate(&shallow, &ir, &cfg);
        let (lo, _) = estimate(&deep, &ir, &cfg);
        assert!(lo < hi, "deeper red modulation must lower SpO2: {lo} vs {hi}");
    }
}
