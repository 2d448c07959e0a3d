//! Rhythm classification from HR and HRV features.
//!
//! A decision procedure over a closed category set; this is a screening
//! signal, not a diagnosis. Severity combines the abnormal-beat percentage
//! with autonomic-balance skew (LF/HF), and the risk score is a bounded
//! weighted sum.

use crate::types::{ArrhythmiaAssessment, ArrhythmiaKind, HrvMetrics};

/// RR deviation from the local median counted as an abnormal beat.
const ABNORMAL_DEVIATION: f32 = 0.2;
/// Coefficient-of-variation floor for fibrillation-like irregularity.
const AFIB_CV: f32 = 0.2;
const BRADYCARDIA_BPM: f32 = 50.0;
const TACHYCARDIA_BPM: f32 = 100.0;

pub(crate) fn classify(hr_bpm: f32, hrv: &HrvMetrics, rr_ms: &[f32]) -> ArrhythmiaAssessment {
    if rr_ms.len() < 3 || hr_bpm <= 0.0 {
        return ArrhythmiaAssessment {
            kind: ArrhythmiaKind::None,
            severity: 0.0,
            risk_score: 0.0,
        };
    }

    let abnormal_pct = abnormal_beat_pct(rr_ms);
    let cv = if hrv.mean_rr_ms > 0.0 {
        hrv.sdnn_ms / hrv.mean_rr_ms
    } else {
        0.0
    };

    let kind = if cv > AFIB_CV && hrv.pnn50_pct > 30.0 {
        // Irregularly irregular: high dispersion with many large successive jumps
        ArrhythmiaKind::AtrialFibrillationLike
    } else if abnormal_pct > 10.0 {
        ArrhythmiaKind::PrematureBeatsLike
    } else if hr_bpm < BRADYCARDIA_BPM {
        ArrhythmiaKind::Bradycardia
    } else if hr_bpm > TACHYCARDIA_BPM {
        ArrhythmiaKind::Tachycardia
    } else if cv > 0.1 && hrv.lf_hf_ratio < 0.5 && hrv.hf_power > 0.0 {
        // Breathing-coupled variation: pronounced but HF-dominated
        ArrhythmiaKind::SinusArrhythmia
    } else {
        ArrhythmiaKind::None
    };

    let lf_hf_skew = (hrv.lf_hf_ratio / 5.0).clamp(0.0, 1.0);
    let severity = (0.6 * (abnormal_pct / 50.0).clamp(0.0, 1.0) + 0.4 * lf_hf_skew).clamp(0.0, 1.0);

    let base_risk = match kind {
        ArrhythmiaKind::None => 0.0,
        ArrhythmiaKind::SinusArrhythmia => 10.0,
        ArrhythmiaKind::Bradycardia | ArrhythmiaKind::Tachycardia => 30.0,
        ArrhythmiaKind::PrematureBeatsLike => 45.0,
        ArrhythmiaKind::AtrialFibrillationLike => 70.0,
    };
    let risk_score = (base_risk + 30.0 * severity).clamp(0.0, 100.0);

    ArrhythmiaAssessment {
        kind,
        severity,
        risk_score,
    }
}

/// Percentage of intervals deviating more than [`ABNORMAL_DEVIATION`] from
/// the series median.
fn abnormal_beat_pct(rr_ms: &[f32]) -> f32 {
    let mut sorted = rr_ms.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[sorted.len() / 2];
    if median <= 0.0 {
        return 0.0;
    }
    let abnormal = rr_ms
        .iter()
        .filter(|&&rr| ((rr - median) / median).abs() > ABNORMAL_DEVIATION)
        .count();
    100.0 * abnormal as f32 / rr_ms.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrv_for(rr_ms: &[f32]) -> HrvMetrics {
        let n = rr_ms.len() as f32;
        let mean = rr_ms.iter().sum::<f32>() / n;
        let sdnn = (rr_ms.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / n).sqrt();
        let mut nn50 = 0;
        let mut diff_sq = 0.0;
        for w in rr_ms.windows(2) {
            let d = w[1] - w[0];
            diff_sq += d * d;
            if d.abs() > 50.0 {
                nn50 += 1;
            }
        }
        HrvMetrics {
            mean_rr_ms: mean,
            sdnn_ms: sdnn,
            rmssd_ms: (diff_sq / (n - 1.0)).sqrt(),
            pnn50_pct: 100.0 * nn50 as f32 / (n - 1.0),
            lf_power: 1.0,
            hf_power: 1.0,
            lf_hf_ratio: 1.0,
        }
    }

    #[test]
    fn test_steady_normal_rhythm() {
        let rr = vec![820.0; 12];
        let a = classify(73.0, &hrv_for(&rr), &rr);
        assert_eq!(a.kind, ArrhythmiaKind::None);
        assert!(a.risk_score < 20.0);
    }

    #[test]
    fn test_bradycardia_and_tachycardia() {
        let slow = vec![1400.0; 10];
        let a = classify(43.0, &hrv_for(&slow), &slow);
        assert_eq!(a.kind, ArrhythmiaKind::Bradycardia);

        let fast = vec![480.0; 10];
        let a = classify(125.0, &hrv_for(&fast), &fast);
        assert_eq!(a.kind, ArrhythmiaKind::Tachycardia);
    }

    #[test]
    fn test_chaotic_intervals_flag_fibrillation_like() {
        let rr = vec![
            620.0, 980.0, 710.0, 1150.0, 560.0, 890.0, 1240.0, 640.0, 1020.0, 760.0, 1180.0, 580.0,
        ];
        let a = classify(72.0, &hrv_for(&rr), &rr);
        assert_eq!(a.kind, ArrhythmiaKind::AtrialFibrillationLike);
        assert!(a.risk_score >= 70.0);
        assert!(a.risk_score <= 100.0);
    }

    #[test]
    fn test_occasional_early_beats() {
        // Mostly steady with two clearly premature intervals
        let rr = vec![
            800.0, 805.0, 795.0, 500.0, 810.0, 800.0, 790.0, 505.0, 800.0, 810.0,
        ];
        let a = classify(75.0, &hrv_for(&rr), &rr);
        assert_eq!(a.kind, ArrhythmiaKind::PrematureBeatsLike);
    }

    #[test]
    fn test_too_few_beats_is_neutral() {
        let a = classify(75.0, &HrvMetrics::default(), &[800.0, 820.0]);
        assert_eq!(a.kind, ArrhythmiaKind::None);
        assert_eq!(a.risk_score, 0.0);
    }

    #[test]
    fn test_risk_score_bounded() {
        let rr = vec![
            400.0, 1500.0, 420.0, 1480.0, 390.0, 1490.0, 410.0, 1500.0, 400.0, 1490.0,
        ];
        let mut hrv = hrv_for(&rr);
        hrv.lf_hf_ratio = 50.0;
        let a = classify(64.0, &hrv, &rr);
        assert!((0.0..=100.0).contains(&a.risk_score));
        assert!((0.0..=1.0).contains(&a.severity));
    }
}
