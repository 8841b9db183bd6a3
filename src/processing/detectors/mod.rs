pub mod r_peak;

pub use r_peak::PeakDetector;

/// Outcome of a rising edge through the detection threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    pub timestamp_ms: f64,
    /// Interval to the previous beat, if there was one.
    pub rr_interval_ms: Option<f64>,
    /// Whether the interval was plausible and fed the rate estimate.
    pub accepted: bool,
    pub heart_rate: f64,
}
