use super::buffer::CircularBuffer;
use super::detectors::{BeatEvent, PeakDetector};
use super::filters::FilterChain;
use super::input::SourceEvent;
use super::scaling::DynamicRangeScaler;
use super::statistics::RunningStatistics;
use crate::config::Config;

use serde::Serialize;
use std::sync::{Arc, Mutex};

// -----------------------------------------------------------------------------
// SIGNAL ENGINE
// -----------------------------------------------------------------------------

/// What one accepted sample did to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReport {
    pub index: usize,
    pub timestamp_ms: f64,
    pub raw: f64,
    pub filtered: f64,
    pub heart_rate: f64,
    pub beat: Option<BeatEvent>,
    pub statistics_updated: bool,
    pub filters_retuned: bool,
    pub range_updated: bool,
    pub contact_restored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    Accepted(SampleReport),
    /// Contact was just lost; ingestion is suspended until a valid sample.
    ContactLost,
    RangeReported { min: f64, max: f64 },
    /// Invalid input; nothing changed.
    Dropped,
}

/// Point-in-time view for display and reporting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngineSnapshot {
    pub samples: usize,
    pub heart_rate: f64,
    pub contact: bool,
    pub range: (f64, f64),
    pub quality: f64,
    pub threshold: f64,
    pub raw: Vec<f64>,
    pub filtered: Vec<f64>,
}

/// Owns every buffer and sub-component; the only mutators are the ingestion
/// calls and `reset`.
pub struct SignalEngine {
    // As constructed; runtime mode switches never write back here
    config: Config,
    index: usize,
    raw: CircularBuffer<f64>,
    filtered: CircularBuffer<f64>,
    filter: FilterChain,
    statistics: RunningStatistics,
    detector: PeakDetector,
    scaler: DynamicRangeScaler,
    contact: bool,
    device_range: Option<(f64, f64)>,
}

impl SignalEngine {
    /// Validates `config` before building the engine.
    pub fn try_new(config: Config) -> Result<Self, String> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Builds an engine from a configuration that already passed
    /// [`Config::validate`]. Zero-sized windows panic here or on ingestion;
    /// use [`SignalEngine::try_new`] for configurations from outside.
    pub fn new(config: Config) -> Self {
        let capacity = config.processor.buffer_capacity;
        let scaler = DynamicRangeScaler::new(config.range.clone());
        let detector = PeakDetector::new(config.detector.clone(), scaler.range());
        Self {
            index: 0,
            raw: CircularBuffer::filled(capacity, f64::NAN),
            filtered: CircularBuffer::filled(capacity, f64::NAN),
            filter: FilterChain::new(config.filters.clone(), config.processor.fs),
            statistics: RunningStatistics::new(config.statistics.clone()),
            detector,
            scaler,
            contact: true,
            device_range: None,
            config,
        }
    }

    /// Routes a classified source event.
    pub fn handle(&mut self, event: SourceEvent) -> IngestOutcome {
        match event {
            SourceEvent::Sample(value) => self.ingest(value),
            SourceEvent::LeadsOff => {
                if self.mark_leads_off() {
                    IngestOutcome::ContactLost
                } else {
                    IngestOutcome::Dropped
                }
            }
            SourceEvent::Diagnostic { min, max } => {
                self.apply_device_range(min, max);
                IngestOutcome::RangeReported { min, max }
            }
            SourceEvent::OutOfRange(_) | SourceEvent::Malformed => IngestOutcome::Dropped,
        }
    }

    /// Processes one raw sample. Non-finite samples are dropped without
    /// touching any state.
    pub fn ingest(&mut self, sample: f64) -> IngestOutcome {
        if !sample.is_finite() {
            return IngestOutcome::Dropped;
        }

        let contact_restored = !self.contact;
        self.contact = true;

        let timestamp_ms = self.index as f64 * self.config.processor.sample_period_ms();

        let statistics_updated = self.statistics.observe(sample);
        let filters_retuned = statistics_updated
            && self
                .filter
                .apply_quality(self.statistics.quality, self.statistics.signal_threshold);

        let filtered = self.filter.process(sample);
        self.raw.push(sample);
        self.filtered.push(filtered);

        let beat = self.detector.process_sample(filtered, timestamp_ms);

        let range_updated = self.scaler.on_sample(&self.raw);
        if range_updated && self.device_range.is_none() {
            let (min, max) = self.scaler.range();
            self.detector.update_threshold_from_range(min, max);
        }

        let report = SampleReport {
            index: self.index,
            timestamp_ms,
            raw: sample,
            filtered,
            heart_rate: self.detector.heart_rate(),
            beat,
            statistics_updated,
            filters_retuned,
            range_updated,
            contact_restored,
        };
        self.index += 1;
        IngestOutcome::Accepted(report)
    }

    /// Returns `true` if contact was previously reported as good.
    pub fn mark_leads_off(&mut self) -> bool {
        if !self.contact {
            return false;
        }
        self.contact = false;
        // An RR interval must not span the gap
        self.detector.disarm();
        true
    }

    /// Takes a source-side (min, max) report; from then on it, not the display
    /// range, drives the detection threshold.
    pub fn apply_device_range(&mut self, min: f64, max: f64) {
        if !min.is_finite() || !max.is_finite() || min > max {
            return;
        }
        self.device_range = Some((min, max));
        self.detector.update_threshold_from_range(min, max);
    }

    /// Reinitialises every component and buffer from the construction
    /// configuration, dropping any runtime mode switches.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Switches adaptive filtering until the next `reset`.
    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.filter.set_adaptive(adaptive);
    }

    /// Pins (or releases) the detection threshold until the next `reset`.
    pub fn set_fixed_threshold(&mut self, threshold: Option<f64>) {
        self.detector.set_fixed_threshold(threshold);
    }

    // QUERIES -----------------------------------------------------------------

    /// The configuration the engine was constructed with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accepted samples since construction or reset.
    pub fn samples(&self) -> usize {
        self.index
    }

    pub fn heart_rate(&self) -> f64 {
        self.detector.heart_rate()
    }

    pub fn contact(&self) -> bool {
        self.contact
    }

    pub fn range(&self) -> (f64, f64) {
        self.scaler.range()
    }

    pub fn normalize(&self, value: f64) -> f64 {
        self.scaler.normalize(value)
    }

    pub fn quality(&self) -> f64 {
        self.statistics.quality
    }

    pub fn threshold(&self) -> f64 {
        self.detector.threshold()
    }

    pub fn beat_count(&self) -> usize {
        self.detector.beat_count()
    }

    pub fn filter(&self) -> &FilterChain {
        &self.filter
    }

    pub fn detector(&self) -> &PeakDetector {
        &self.detector
    }

    /// The last `count` (raw, filtered) pairs, oldest first. Borrowing the
    /// engine keeps ingestion out while the iterator lives.
    pub fn latest(&self, count: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.raw.latest(count).zip(self.filtered.latest(count))
    }

    /// Every retained (raw, filtered) pair, oldest first.
    pub fn recording(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.latest(self.raw.len())
    }

    pub fn snapshot(&self, window: usize) -> EngineSnapshot {
        let (raw, filtered): (Vec<f64>, Vec<f64>) = self.latest(window).unzip();
        EngineSnapshot {
            samples: self.index,
            heart_rate: self.heart_rate(),
            contact: self.contact,
            range: self.range(),
            quality: self.quality(),
            threshold: self.threshold(),
            raw,
            filtered,
        }
    }
}

// SHARED ENGINE ---------------------------------------------------------------

pub type SharedSignalEngine = Arc<Mutex<SignalEngine>>;

pub fn create_shared_engine(config: Config) -> SharedSignalEngine {
    Arc::new(Mutex::new(SignalEngine::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SignalEngine {
        SignalEngine::new(Config::default())
    }

    fn accepted(outcome: IngestOutcome) -> SampleReport {
        match outcome {
            IngestOutcome::Accepted(report) => report,
            other => panic!("expected an accepted sample, got {:?}", other),
        }
    }

    #[test]
    fn nan_is_dropped_without_side_effects() {
        let mut engine = engine();
        for value in [510.0, 512.0, 515.0] {
            engine.ingest(value);
        }
        let before = engine.snapshot(10);
        assert_eq!(engine.ingest(f64::NAN), IngestOutcome::Dropped);
        assert_eq!(engine.snapshot(10), before);
        let report = accepted(engine.ingest(514.0));
        assert_eq!(report.index, 3);
        assert_eq!(report.timestamp_ms, 30.0);
    }

    #[test]
    fn raw_and_filtered_advance_together() {
        let mut engine = engine();
        for i in 0..7000 {
            engine.ingest(500.0 + (i % 10) as f64);
        }
        let pairs: Vec<_> = engine.latest(3).collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].0, 500.0 + (6999 % 10) as f64);
        assert_eq!(engine.recording().count(), 5000);
    }

    #[test]
    fn leads_off_suspends_until_next_valid_sample() {
        let mut engine = engine();
        engine.ingest(500.0);
        assert_eq!(engine.handle(SourceEvent::LeadsOff), IngestOutcome::ContactLost);
        assert!(!engine.contact());
        assert_eq!(engine.handle(SourceEvent::LeadsOff), IngestOutcome::Dropped);
        assert_eq!(engine.samples(), 1);

        assert_eq!(engine.handle(SourceEvent::Malformed), IngestOutcome::Dropped);
        assert!(!engine.contact());

        let report = accepted(engine.handle(SourceEvent::Sample(501.0)));
        assert!(report.contact_restored);
        assert!(engine.contact());
    }

    #[test]
    fn device_range_drives_the_threshold() {
        let mut engine = engine();
        let initial = engine.threshold();
        engine.handle(SourceEvent::Diagnostic {
            min: 300.0,
            max: 800.0,
        });
        let target = 300.0 + 0.7 * 500.0;
        assert!((engine.threshold() - (initial + 0.1 * (target - initial))).abs() < 1e-9);
    }

    #[test]
    fn reset_matches_a_fresh_engine() {
        let signal: Vec<f64> = (0..1500)
            .map(|i| if i % 70 < 4 { 880.0 } else { 420.0 + (i % 7) as f64 })
            .collect();

        let mut reused = engine();
        for &v in signal.iter().rev() {
            reused.ingest(v);
        }
        reused.mark_leads_off();
        reused.apply_device_range(100.0, 200.0);
        reused.reset();

        let mut fresh = engine();
        for &v in &signal {
            let a = reused.ingest(v);
            let b = fresh.ingest(v);
            assert_eq!(a, b);
        }
        assert_eq!(reused.snapshot(5000), fresh.snapshot(5000));
    }

    #[test]
    fn reset_drops_runtime_mode_switches() {
        let signal: Vec<f64> = (0..2000)
            .map(|i| if i % 60 < 4 { 900.0 } else { 400.0 + (i % 9) as f64 })
            .collect();

        let mut switched = engine();
        switched.set_adaptive(false);
        switched.set_fixed_threshold(Some(650.0));
        for &v in signal.iter().take(300) {
            switched.ingest(v);
        }
        switched.reset();
        assert_eq!(switched.threshold(), engine().threshold());

        let mut fresh = engine();
        for &v in &signal {
            assert_eq!(switched.ingest(v), fresh.ingest(v));
        }
        assert_eq!(switched.filter().notch_q(), fresh.filter().notch_q());
        assert_eq!(switched.snapshot(2000), fresh.snapshot(2000));
    }

    #[test]
    fn try_new_rejects_unusable_windows() {
        let mut config = Config::default();
        config.processor.buffer_capacity = 0;
        assert!(SignalEngine::try_new(config).is_err());

        let mut config = Config::default();
        config.statistics.update_interval = 0;
        assert!(SignalEngine::try_new(config).is_err());

        let mut config = Config::default();
        config.detector.rr_history = 0;
        assert!(SignalEngine::try_new(config).is_err());

        assert!(SignalEngine::try_new(Config::default()).is_ok());
    }

    #[test]
    fn shared_engine_snapshots_under_lock() {
        let shared = create_shared_engine(Config::default());
        let writer = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            for i in 0..500 {
                writer.lock().unwrap().ingest(500.0 + (i % 3) as f64);
            }
        });
        handle.join().unwrap();
        let snapshot = shared.lock().unwrap().snapshot(100);
        assert_eq!(snapshot.samples, 500);
        assert_eq!(snapshot.raw.len(), snapshot.filtered.len());
    }
}
