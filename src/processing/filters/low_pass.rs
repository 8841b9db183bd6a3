use super::biquad::SecondOrderFilter;
use super::FilterStage;

pub const MIN_SMOOTHING: f64 = 0.2;
pub const MAX_SMOOTHING: f64 = 0.8;
const SMOOTHING_HYSTERESIS: f64 = 1e-3;

/// Samples the chain must have seen before smoothing follows signal quality.
pub const ADAPTIVE_WARMUP_SAMPLES: usize = 50;

/// Final smoothing stage. `smoothing` is the weight each pole keeps of its
/// previous output, so larger values smooth harder.
pub struct LowPassFilter {
    filter: SecondOrderFilter,
    default_smoothing: f64,
    smoothing: f64,
}

impl LowPassFilter {
    pub fn new(smoothing: f64) -> Self {
        let smoothing = smoothing.clamp(0.0, MAX_SMOOTHING);
        Self {
            filter: SecondOrderFilter::smoother(smoothing),
            default_smoothing: smoothing,
            smoothing,
        }
    }

    /// Most recent output of the stage.
    pub fn output(&self) -> f64 {
        self.filter.previous_outputs().0
    }

    /// Picks the smoothing for the next sample.
    ///
    /// A jump larger than `signal_threshold` between the last two outputs means
    /// a genuine deflection is under way, so smoothing drops to the minimum.
    /// Otherwise, once warmed up in adaptive mode, noisier signals get more
    /// smoothing. Non-adaptive mode always uses the configured value.
    pub fn select_smoothing(
        &self,
        adaptive: bool,
        signal_threshold: f64,
        quality: f64,
        samples_seen: usize,
    ) -> f64 {
        if !adaptive {
            return self.default_smoothing;
        }

        let (last, before) = self.filter.previous_outputs();
        if (last - before).abs() > signal_threshold {
            return MIN_SMOOTHING;
        }

        if samples_seen >= ADAPTIVE_WARMUP_SAMPLES {
            return (MIN_SMOOTHING + (1.0 - quality) * 0.2).clamp(MIN_SMOOTHING, MAX_SMOOTHING);
        }

        self.default_smoothing
    }

    pub fn set_smoothing(&mut self, smoothing: f64) {
        if (smoothing - self.smoothing).abs() <= SMOOTHING_HYSTERESIS {
            return;
        }
        self.smoothing = smoothing;
        self.filter.retune(&SecondOrderFilter::smoother(smoothing));
    }
}

impl FilterStage for LowPassFilter {
    fn name(&self) -> &'static str {
        "low_pass"
    }

    fn process(&mut self, input: f64) -> f64 {
        self.filter.calculate_output(input)
    }

    fn prime(&mut self, input: f64) {
        self.filter.prime(input, input);
    }
}
