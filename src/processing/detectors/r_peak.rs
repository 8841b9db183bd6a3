use super::BeatEvent;
use crate::config::PeakDetectorConfig;
use crate::processing::buffer::CircularBuffer;

const RANGE_THRESHOLD_FRACTION: f64 = 0.7;
const REARM_FRACTION: f64 = 0.7;
const THRESHOLD_ADAPT_RATE: f64 = 0.1;

const MIN_BPM: f64 = 40.0;
const MAX_BPM: f64 = 200.0;
const PRELIMINARY_BEATS: usize = 3;
const PREVIOUS_RATE_WEIGHT: f64 = 0.3;

/// R-peak detector and heart-rate estimator.
///
/// Armed, it waits for the filtered signal to rise above `threshold`; after a
/// trigger it stays refractory until the signal falls below
/// `0.7 × threshold`. Plausible RR intervals go into a small ring and the
/// rate estimate is smoothed over it. A heart rate of `0.0` means unknown.
pub struct PeakDetector {
    config: PeakDetectorConfig,
    threshold: f64,
    last_peak_ms: Option<f64>,
    above_threshold: bool,
    rr_intervals: CircularBuffer<f64>,
    beat_count: usize,
    heart_rate: f64,
}

impl PeakDetector {
    /// `range` is the (min, max) the threshold is initially derived from,
    /// unless the configuration pins it.
    pub fn new(config: PeakDetectorConfig, range: (f64, f64)) -> Self {
        let threshold = config
            .fixed_threshold
            .unwrap_or_else(|| range_threshold(range.0, range.1));
        let rr_intervals = CircularBuffer::new(config.rr_history);
        Self {
            config,
            threshold,
            last_peak_ms: None,
            above_threshold: false,
            rr_intervals,
            beat_count: 0,
            heart_rate: 0.0,
        }
    }

    pub fn process_sample(&mut self, filtered: f64, now_ms: f64) -> Option<BeatEvent> {
        if !filtered.is_finite() {
            return None;
        }

        if self.above_threshold {
            if filtered < REARM_FRACTION * self.threshold {
                self.above_threshold = false;
            }
            return None;
        }

        if filtered <= self.threshold {
            return None;
        }

        let spaced = self
            .last_peak_ms
            .map_or(true, |last| now_ms - last >= self.config.min_beat_spacing_ms);
        if !spaced {
            return None;
        }

        self.above_threshold = true;
        let rr_interval_ms = self.last_peak_ms.map(|last| now_ms - last);
        self.last_peak_ms = Some(now_ms);

        let accepted = rr_interval_ms.map_or(false, |rr| {
            rr >= self.config.min_rr_ms && rr <= self.config.max_rr_ms
        });
        if let (true, Some(rr)) = (accepted, rr_interval_ms) {
            self.accept_interval(rr);
        }

        Some(BeatEvent {
            timestamp_ms: now_ms,
            rr_interval_ms,
            accepted,
            heart_rate: self.heart_rate,
        })
    }

    fn accept_interval(&mut self, rr: f64) {
        self.rr_intervals.push(rr);
        self.beat_count += 1;

        if self.beat_count < PRELIMINARY_BEATS {
            // Quick first estimate straight from the latest interval
            self.heart_rate = 60_000.0 / rr;
            return;
        }

        let mean_rr = self.rr_intervals.iter().sum::<f64>() / self.rr_intervals.len() as f64;
        let bpm = (60_000.0 / mean_rr).clamp(MIN_BPM, MAX_BPM);
        self.heart_rate = if self.heart_rate > 0.0 {
            PREVIOUS_RATE_WEIGHT * self.heart_rate + (1.0 - PREVIOUS_RATE_WEIGHT) * bpm
        } else {
            bpm
        };
    }

    /// Moves the threshold a step toward `min + 0.7 × (max − min)`.
    /// Ignored while the threshold is pinned by configuration.
    pub fn update_threshold_from_range(&mut self, min: f64, max: f64) {
        if self.config.fixed_threshold.is_some() {
            return;
        }
        let target = range_threshold(min, max);
        if !target.is_finite() {
            return;
        }
        self.threshold += THRESHOLD_ADAPT_RATE * (target - self.threshold);
    }

    pub fn set_fixed_threshold(&mut self, threshold: Option<f64>) {
        self.config.fixed_threshold = threshold;
        if let Some(threshold) = threshold {
            self.threshold = threshold;
        }
    }

    /// Forgets the last peak and the refractory latch, keeping the rate
    /// history. Used when electrode contact is lost.
    pub fn disarm(&mut self) {
        self.last_peak_ms = None;
        self.above_threshold = false;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn heart_rate(&self) -> f64 {
        self.heart_rate
    }

    pub fn beat_count(&self) -> usize {
        self.beat_count
    }

    pub fn is_refractory(&self) -> bool {
        self.above_threshold
    }

    pub fn rr_intervals(&self) -> Vec<f64> {
        self.rr_intervals.iter().collect()
    }
}

fn range_threshold(min: f64, max: f64) -> f64 {
    min + RANGE_THRESHOLD_FRACTION * (max - min)
}
