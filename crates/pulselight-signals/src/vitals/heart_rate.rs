//! Heart-rate estimation from beat intervals, with a spectral fallback.

use pulselight_dsp::FrequencySpectrum;

#[derive(Debug, Clone, Copy)]
pub(crate) struct HeartRate {
    pub bpm: f32,
    pub confidence: f32,
}

/// Prefer the mean of gated RR intervals; fall back to the dominant
/// spectral frequency when too few beats survived the gate.
///
/// Confidence blends peak SNR, spectral purity, and RR consistency.
pub(crate) fn estimate(rr_ms: &[f32], spectrum: &FrequencySpectrum) -> HeartRate {
    let (bpm, rr_consistency) = if rr_ms.len() >= 3 {
        let mean = rr_ms.iter().sum::<f32>() / rr_ms.len() as f32;
        let var = rr_ms.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / rr_ms.len() as f32;
        let cv = var.sqrt() / mean.max(1e-3);
        (60000.0 / mean.max(1e-3), (1.0 - cv).clamp(0.0, 1.0))
    } else if spectrum.dominant_frequency > 0.0 {
        // Spectral fallback carries no beat-to-beat evidence
        (spectrum.dominant_frequency * 60.0, 0.3)
    } else {
        (0.0, 0.0)
    };

    if bpm <= 0.0 {
        return HeartRate {
            bpm: 0.0,
            confidence: 0.0,
        };
    }

    let snr_conf = ((spectrum.snr_db + 5.0) / 15.0).clamp(0.0, 1.0);
    let confidence =
        (0.4 * snr_conf + 0.3 * spectrum.spectral_purity + 0.3 * rr_consistency).clamp(0.0, 1.0);

    HeartRate { bpm, confidence }
}
