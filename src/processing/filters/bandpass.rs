use super::biquad::SecondOrderFilter;
use super::FilterStage;
use std::f64::consts::PI;

// How far the band narrows at the lowest quality score
const LOW_CUTOFF_SHIFT_HZ: f64 = 0.5;
const HIGH_CUTOFF_SHIFT_HZ: f64 = 15.0;

const LOW_CUTOFF_HYSTERESIS_HZ: f64 = 0.05;
const HIGH_CUTOFF_HYSTERESIS_HZ: f64 = 1.0;

/// Cardiac-band filter that keeps the signal baseline.
///
/// The biquad removes everything below `f_low`; a one-pole tracker at the same
/// corner restores that slow component, so the output stays on the raw ADC
/// scale and only content above `f_high` is attenuated.
pub struct BandPassFilter {
    filter: SecondOrderFilter,
    fs: f64,
    default_low: f64,
    default_high: f64,
    f_low: f64,
    f_high: f64,
    baseline: f64,
    baseline_rate: f64,
}

impl BandPassFilter {
    pub fn new(f_low: f64, f_high: f64, fs: f64) -> Self {
        Self {
            filter: SecondOrderFilter::bandpass(f_low, f_high, fs),
            fs,
            default_low: f_low,
            default_high: f_high,
            f_low,
            f_high,
            baseline: 0.0,
            baseline_rate: baseline_rate(f_low, fs),
        }
    }

    pub fn cutoffs(&self) -> (f64, f64) {
        (self.f_low, self.f_high)
    }

    /// Cutoffs for a given quality score: the configured band at full quality,
    /// narrowed on both sides as the signal gets noisier.
    pub fn target_cutoffs(&self, quality: f64) -> (f64, f64) {
        let noise = 1.0 - quality.clamp(0.0, 1.0);
        let low = self.default_low + noise * LOW_CUTOFF_SHIFT_HZ;
        let high = (self.default_high - noise * HIGH_CUTOFF_SHIFT_HZ).max(2.0 * low);
        (low, high)
    }

    pub fn retune(&mut self, quality: f64) -> bool {
        let (low, high) = self.target_cutoffs(quality);
        let low_moved = (low - self.f_low).abs() > LOW_CUTOFF_HYSTERESIS_HZ;
        let high_moved = (high - self.f_high).abs() > HIGH_CUTOFF_HYSTERESIS_HZ;
        if !low_moved && !high_moved {
            return false;
        }

        self.f_low = low;
        self.f_high = high;
        self.filter.retune(&SecondOrderFilter::bandpass(low, high, self.fs));
        self.baseline_rate = baseline_rate(low, self.fs);
        true
    }
}

impl FilterStage for BandPassFilter {
    fn name(&self) -> &'static str {
        "bandpass"
    }

    fn process(&mut self, input: f64) -> f64 {
        self.baseline += self.baseline_rate * (input - self.baseline);
        if !self.baseline.is_finite() {
            self.baseline = input;
        }
        self.filter.calculate_output(input) + self.baseline
    }

    fn prime(&mut self, input: f64) {
        self.baseline = input;
        self.filter.prime(input, 0.0);
    }
}

fn baseline_rate(corner_hz: f64, fs: f64) -> f64 {
    1.0 - (-2.0 * PI * corner_hz / fs).exp()
}
