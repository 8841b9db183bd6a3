use super::buffer::CircularBuffer;
use crate::config::StatisticsConfig;

// STATISTICS COMPONENT --------------------------------------------------------

const NOISE_EPSILON: f64 = 1e-6;
const QUALITY_FLOOR: f64 = 0.1;
const SMOOTHING_OLD: f64 = 0.9;
const SIGNAL_THRESHOLD_STD_DEVS: f64 = 1.5;

/// Windowed mean/variance over the raw signal, with a derived noise estimate
/// and a 0.1–1.0 quality score.
///
/// Only valid samples are observed. Statistics are recomputed over the whole
/// history every `update_interval` observations and blended into the running
/// values, so quality moves slowly even when the window changes abruptly.
pub struct RunningStatistics {
    config: StatisticsConfig,
    history: CircularBuffer<f64>,
    count: usize,
    seeded: bool,
    pub mean: f64,
    pub variance: f64,
    pub noise_estimate: f64,
    pub quality: f64,
    pub signal_threshold: f64,
}

impl RunningStatistics {
    pub fn new(config: StatisticsConfig) -> Self {
        let history = CircularBuffer::new(config.history_size);
        Self {
            config,
            history,
            count: 0,
            seeded: false,
            mean: 0.0,
            variance: 0.0,
            noise_estimate: 0.0,
            quality: 1.0,
            signal_threshold: 0.0,
        }
    }

    /// Records one raw sample. Returns `true` when this observation triggered a
    /// recomputation of the window statistics.
    pub fn observe(&mut self, sample: f64) -> bool {
        if !sample.is_finite() {
            return false;
        }

        self.history.push(sample);
        self.count += 1;

        if self.count % self.config.update_interval == 0 {
            return self.update_statistics();
        }
        false
    }

    /// Number of valid samples observed since construction or reset.
    pub fn count(&self) -> usize {
        self.count
    }

    fn update_statistics(&mut self) -> bool {
        let Some((window_mean, window_variance)) = welford(self.history.iter()) else {
            return false;
        };
        if !window_mean.is_finite() || !window_variance.is_finite() {
            return false;
        }

        if self.seeded {
            self.mean = SMOOTHING_OLD * self.mean + (1.0 - SMOOTHING_OLD) * window_mean;
            self.variance = SMOOTHING_OLD * self.variance + (1.0 - SMOOTHING_OLD) * window_variance;
        } else {
            // Nothing to smooth against yet
            self.mean = window_mean;
            self.variance = window_variance;
            self.seeded = true;
        }

        let std_dev = self.variance.sqrt();
        self.noise_estimate = std_dev / (self.mean.abs() + NOISE_EPSILON);
        self.quality = quality_score(self.noise_estimate);
        self.signal_threshold = SIGNAL_THRESHOLD_STD_DEVS * std_dev;
        true
    }
}

/// One-pass population mean and variance. `None` for fewer than two values.
fn welford(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut n = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;

    for x in values.filter(|x| x.is_finite()) {
        n += 1;
        let delta = x - mean;
        mean += delta / n as f64;
        m2 += delta * (x - mean);
    }

    if n < 2 {
        return None;
    }
    Some((mean, m2 / n as f64))
}

fn quality_score(noise_estimate: f64) -> f64 {
    if !noise_estimate.is_finite() {
        return QUALITY_FLOOR;
    }
    (1.0 / (1.0 + 2.0 * noise_estimate)).clamp(QUALITY_FLOOR, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RunningStatistics {
        RunningStatistics::new(StatisticsConfig::default())
    }

    #[test]
    fn recomputes_every_update_interval() {
        let mut stats = stats();
        for i in 1..50 {
            assert!(!stats.observe(500.0 + i as f64 % 3.0));
        }
        assert!(stats.observe(500.0));
        assert!(stats.mean > 499.0 && stats.mean < 503.0);
    }

    #[test]
    fn constant_signal_has_full_quality() {
        let mut stats = stats();
        for _ in 0..200 {
            stats.observe(512.0);
        }
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.quality, 1.0);
        assert_eq!(stats.signal_threshold, 0.0);
    }

    #[test]
    fn invalid_samples_are_not_observed() {
        let mut stats = stats();
        stats.observe(f64::NAN);
        stats.observe(f64::INFINITY);
        assert_eq!(stats.count(), 0);
    }

    #[test]
    fn quality_has_a_floor() {
        let mut stats = stats();
        // zero-mean, large swing: noise estimate explodes
        for i in 0..200 {
            stats.observe(if i % 2 == 0 { 1000.0 } else { -1000.0 });
        }
        assert_eq!(stats.quality, QUALITY_FLOOR);
    }

    #[test]
    fn later_windows_are_blended_not_replaced() {
        let mut stats = stats();
        for _ in 0..50 {
            stats.observe(100.0);
        }
        assert_eq!(stats.mean, 100.0);
        for _ in 0..50 {
            stats.observe(300.0);
        }
        // window mean is 200, blended 0.9 * 100 + 0.1 * 200
        assert!((stats.mean - 110.0).abs() < 1e-9);
    }

    #[test]
    fn welford_matches_two_pass_on_large_offsets() {
        let values: Vec<f64> = (0..200).map(|i| 1e9 + (i % 7) as f64).collect();
        let (mean, variance) = welford(values.iter().copied()).unwrap();
        let expected_mean = values.iter().sum::<f64>() / values.len() as f64;
        let expected_var = values
            .iter()
            .map(|v| (v - expected_mean).powi(2))
            .sum::<f64>()
            / values.len() as f64;
        assert!((mean - expected_mean).abs() < 1e-6);
        assert!((variance - expected_var).abs() < 1e-6);
    }
}
