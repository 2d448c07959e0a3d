//! Streaming single-sample heartbeat detection.
//!
//! Consumes one filtered intensity sample per capture tick and emits beat
//! events plus a smoothed BPM for live feedback. Batch analysis lives in
//! [`crate::VitalsEstimator`]; this path trades accuracy for latency.
//!
//! Per sample: median-of-3, moving-average-of-3, then an EMA; a slowly
//! drifting baseline is subtracted and a 3-point derivative tracked. A peak
//! candidate opens on a threshold crossing with a falling slope and is
//! confirmed once the signal has dropped below a fraction of the candidate
//! amplitude with a monotonically decreasing tail, no sooner than the
//! refractory interval after the previous beat.
//!
//! Callers must serialize calls per detector instance; independent
//! instances share nothing.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatDetectorConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Warm-up span after construction or reset (seconds); no beat events
    /// are emitted inside it.
    pub warmup_sec: f32,
    /// EMA coefficient for the smoothing stage.
    pub ema_alpha: f32,
    /// EMA coefficient for the drifting baseline.
    pub baseline_alpha: f32,
    /// Candidate threshold as a multiple of the running amplitude.
    pub threshold_k: f32,
    /// Confirmation level as a fraction of the candidate amplitude.
    pub confirm_fraction: f32,
    /// Refractory interval between beats (ms).
    pub min_interbeat_ms: i64,
    /// Bounded RR-interval history length.
    pub rr_history: usize,
    /// EMA coefficient for the instantaneous BPM.
    pub bpm_alpha: f32,
    /// Median window over recent rounded BPM values.
    pub bpm_median_window: usize,
    /// Consecutive low-amplitude samples triggering a peak-tracker reset.
    pub low_amp_reset_samples: usize,
    /// Fraction of the running amplitude considered "low".
    pub low_amp_fraction: f32,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            warmup_sec: 3.0,
            ema_alpha: 0.3,
            baseline_alpha: 0.05,
            threshold_k: 1.1,
            confirm_fraction: 0.7,
            min_interbeat_ms: 400, // 150 BPM ceiling
            rr_history: 10,
            bpm_alpha: 0.3,
            bpm_median_window: 5,
            low_amp_reset_samples: 45, // 1.5 s at 30 fps
            low_amp_fraction: 0.1,
        }
    }
}

/// Detector phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorState {
    WarmingUp,
    Running,
}

/// Output of one [`StreamingBeatDetector::process`] call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeatUpdate {
    /// True exactly when this sample confirmed a beat.
    pub is_beat: bool,
    /// Median-stabilized BPM; 0 until two beats have been confirmed.
    pub bpm: f32,
    /// Confidence in [0, 1] from RR consistency and history depth.
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    peak_value: f32,
}

/// Online heartbeat detector. One instance per monitoring session.
pub struct StreamingBeatDetector {
    config: BeatDetectorConfig,
    state: DetectorState,
    start_ms: Option<i64>,

    raw3: VecDeque<f32>,
    median3: VecDeque<f32>,
    ema: Option<f32>,
    baseline: Option<f32>,
    /// Running mean magnitude of the normalized signal.
    amp_ema: Option<f32>,
    /// Trailing normalized samples for the monotonic-decrease check.
    trail: VecDeque<f32>,

    candidate: Option<Candidate>,
    last_beat_ms: Option<i64>,
    rr_history_ms: VecDeque<f32>,
    bpm_ema: Option<f32>,
    bpm_recent: VecDeque<f32>,
    low_amp_run: usize,
}

impl StreamingBeatDetector {
    pub fn new() -> Self {
        Self::with_config(BeatDetectorConfig::default())
    }

    pub fn with_config(config: BeatDetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::WarmingUp,
            start_ms: None,
            raw3: VecDeque::with_capacity(3),
            median3: VecDeque::with_capacity(3),
            ema: None,
            baseline: None,
            amp_ema: None,
            trail: VecDeque::with_capacity(8),
            candidate: None,
            last_beat_ms: None,
            rr_history_ms: VecDeque::new(),
            bpm_ema: None,
            bpm_recent: VecDeque::new(),
            low_amp_run: 0,
        }
    }

    pub fn config(&self) -> &BeatDetectorConfig {
        &self.config
    }

    /// Replace the configuration; effective from the next sample. Session
    /// state is untouched.
    pub fn set_config(&mut self, config: BeatDetectorConfig) {
        self.config = config;
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Clear every piece of session state and return to warm-up.
    /// Configuration is unaffected.
    pub fn reset(&mut self) {
        let config = self.config.clone();
        *self = Self::with_config(config);
    }

    /// Feed one sample. Must not be called concurrently for the same
    /// instance.
    pub fn process(&mut self, sample: f32, timestamp_ms: i64) -> BeatUpdate {
        // Smoothing chain: median-of-3 -> moving-average-of-3 -> EMA
        push_bounded(&mut self.raw3, sample, 3);
        let median = median_of(&self.raw3);
        push_bounded(&mut self.median3, median, 3);
        let ma = self.median3.iter().sum::<f32>() / self.median3.len() as f32;
        let ema = match self.ema {
            Some(prev) => self.config.ema_alpha * ma + (1.0 - self.config.ema_alpha) * prev,
            None => ma,
        };
        self.ema = Some(ema);

        // Drifting baseline and normalized signal
        let baseline = match self.baseline {
            Some(prev) => {
                self.config.baseline_alpha * ema + (1.0 - self.config.baseline_alpha) * prev
            }
            None => ema,
        };
        self.baseline = Some(baseline);
        let normalized = ema - baseline;

        push_bounded(&mut self.trail, normalized, 5);
        let derivative = if self.trail.len() >= 3 {
            (self.trail[self.trail.len() - 1] - self.trail[self.trail.len() - 3]) / 2.0
        } else {
            0.0
        };

        // Running amplitude: slow EMA of |normalized|
        let amp = match self.amp_ema {
            Some(prev) => 0.02 * normalized.abs() + 0.98 * prev,
            None => normalized.abs(),
        };
        self.amp_ema = Some(amp);

        // Warm-up gate
        let start = *self.start_ms.get_or_insert(timestamp_ms);
        if self.state == DetectorState::WarmingUp {
            if timestamp_ms - start >= (self.config.warmup_sec * 1000.0) as i64 {
                self.state = DetectorState::Running;
                debug!("beat detector running");
            } else {
                return self.update(false);
            }
        }

        // Stale-state guard: a run of low-amplitude samples (finger lifted)
        // drops peak tracking but keeps the BPM history
        if normalized.abs() < self.config.low_amp_fraction * amp.max(f32::EPSILON) {
            self.low_amp_run += 1;
            if self.low_amp_run >= self.config.low_amp_reset_samples {
                self.candidate = None;
                self.trail.clear();
                self.low_amp_run = 0;
                debug!("low-amplitude run, peak tracking cleared");
                return self.update(false);
            }
        } else {
            self.low_amp_run = 0;
        }

        // Candidate handling
        let threshold = self.config.threshold_k * amp;
        match self.candidate {
            None => {
                // Open just past the crest: above threshold and falling
                if normalized > threshold && derivative < 0.0 {
                    self.candidate = Some(Candidate {
                        peak_value: normalized,
                    });
                }
            }
            Some(ref mut cand) => {
                if normalized > cand.peak_value {
                    cand.peak_value = normalized;
                }
                let dropped = normalized < self.config.confirm_fraction * cand.peak_value;
                let decreasing = self.trail.len() >= 3 && {
                    let k = self.trail.len();
                    self.trail[k - 1] <= self.trail[k - 2] && self.trail[k - 2] <= self.trail[k - 3]
                };
                if dropped && decreasing {
                    let refractory_ok = self
                        .last_beat_ms
                        .map(|last| timestamp_ms - last >= self.config.min_interbeat_ms)
                        .unwrap_or(true);
                    self.candidate = None;
                    if refractory_ok {
                        return self.confirm_beat(timestamp_ms);
                    }
                }
            }
        }

        self.update(false)
    }

    fn confirm_beat(&mut self, timestamp_ms: i64) -> BeatUpdate {
        if let Some(last) = self.last_beat_ms {
            let rr = (timestamp_ms - last) as f32;
            push_bounded(&mut self.rr_history_ms, rr, self.config.rr_history);

            let inst_bpm = 60000.0 / rr.max(1.0);
            let bpm = match self.bpm_ema {
                Some(prev) => {
                    self.config.bpm_alpha * inst_bpm + (1.0 - self.config.bpm_alpha) * prev
                }
                None => inst_bpm,
            };
            self.bpm_ema = Some(bpm);
            push_bounded(
                &mut self.bpm_recent,
                bpm.round(),
                self.config.bpm_median_window,
            );
        }
        self.last_beat_ms = Some(timestamp_ms);
        self.update(true)
    }

    fn update(&self, is_beat: bool) -> BeatUpdate {
        BeatUpdate {
            is_beat,
            bpm: self.reported_bpm(),
            confidence: self.confidence(),
        }
    }

    /// Median over recent rounded smoothed BPM values.
    fn reported_bpm(&self) -> f32 {
        if self.bpm_recent.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f32> = self.bpm_recent.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted[sorted.len() / 2]
    }

    /// RR-consistency confidence, scaled up as the history fills.
    fn confidence(&self) -> f32 {
        let n = self.rr_history_ms.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.rr_history_ms.iter().sum::<f32>() / n as f32;
        if mean <= 0.0 {
            return 0.0;
        }
        let var = self
            .rr_history_ms
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f32>()
            / n as f32;
        let consistency = (1.0 - var.sqrt() / mean).clamp(0.0, 1.0);
        let depth = (n as f32 / 5.0).clamp(0.0, 1.0);
        consistency * depth
    }
}

impl Default for StreamingBeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(buf: &mut VecDeque<f32>, value: f32, cap: usize) {
    buf.push_back(value);
    while buf.len() > cap {
        buf.pop_front();
    }
}

fn median_of(buf: &VecDeque<f32>) -> f32 {
    let mut v: Vec<f32> = buf.iter().copied().collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v[v.len() / 2]
}
