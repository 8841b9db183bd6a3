use super::buffer::CircularBuffer;
use crate::config::RangeConfig;

const SMOOTHING_OLD: f64 = 0.9;

/// Slow-moving display range over the raw signal.
///
/// Every `update_interval` accepted samples it scans the most recent raw
/// values and nudges `min_value`/`max_value` toward what it saw. The range
/// never collapses below `min_span`.
pub struct DynamicRangeScaler {
    config: RangeConfig,
    samples_since_update: usize,
    pub min_value: f64,
    pub max_value: f64,
}

impl DynamicRangeScaler {
    pub fn new(config: RangeConfig) -> Self {
        let mut scaler = Self {
            min_value: config.initial_min,
            max_value: config.initial_max,
            samples_since_update: 0,
            config,
        };
        scaler.enforce_min_span();
        scaler
    }

    /// Counts one accepted sample and rescans `raw` when the interval is up.
    /// Returns whether the range was updated.
    pub fn on_sample(&mut self, raw: &CircularBuffer<f64>) -> bool {
        self.samples_since_update += 1;
        if self.samples_since_update < self.config.update_interval {
            return false;
        }
        self.samples_since_update = 0;
        self.rescan(raw)
    }

    fn rescan(&mut self, raw: &CircularBuffer<f64>) -> bool {
        let mut valid = 0usize;
        let mut recent_min = f64::INFINITY;
        let mut recent_max = f64::NEG_INFINITY;

        for value in raw
            .latest(self.config.scan_window)
            .filter(|value| value.is_finite())
        {
            valid += 1;
            recent_min = recent_min.min(value);
            recent_max = recent_max.max(value);
        }

        if valid < self.config.min_valid_samples {
            return false;
        }

        self.min_value = SMOOTHING_OLD * self.min_value + (1.0 - SMOOTHING_OLD) * recent_min;
        self.max_value = SMOOTHING_OLD * self.max_value + (1.0 - SMOOTHING_OLD) * recent_max;
        self.enforce_min_span();
        true
    }

    fn enforce_min_span(&mut self) {
        if self.max_value - self.min_value < self.config.min_span {
            self.max_value = self.min_value + self.config.min_span;
        }
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min_value, self.max_value)
    }

    /// Maps `value` into 0..1 over the current range, clamped.
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min_value) / (self.max_value - self.min_value)).clamp(0.0, 1.0)
    }
}
