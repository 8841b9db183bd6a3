use super::biquad::SecondOrderFilter;
use super::FilterStage;

const MIN_Q: f64 = 5.0;
const Q_HYSTERESIS: f64 = 1.0;

/// Power-line notch whose Q widens as signal quality drops.
pub struct NotchFilter {
    filter: SecondOrderFilter,
    fs: f64,
    centre_hz: f64,
    default_q: f64,
    q: f64,
}

impl NotchFilter {
    pub fn new(centre_hz: f64, q: f64, fs: f64) -> Self {
        Self {
            filter: SecondOrderFilter::notch(centre_hz, fs, q),
            fs,
            centre_hz,
            default_q: q,
            q,
        }
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    /// Q for a given quality score: the configured Q at full quality,
    /// proportionally wider (lower Q) for noisier signals.
    pub fn target_q(&self, quality: f64) -> f64 {
        (self.default_q * quality).max(MIN_Q.min(self.default_q))
    }

    /// Recomputes coefficients only when the target Q has moved outside the
    /// hysteresis band. Returns whether a retune happened.
    pub fn retune(&mut self, quality: f64) -> bool {
        let target = self.target_q(quality);
        if (target - self.q).abs() <= Q_HYSTERESIS {
            return false;
        }
        self.q = target;
        self.filter.retune(&SecondOrderFilter::notch(self.centre_hz, self.fs, self.q));
        true
    }
}

impl FilterStage for NotchFilter {
    fn name(&self) -> &'static str {
        "notch"
    }

    fn process(&mut self, input: f64) -> f64 {
        self.filter.calculate_output(input)
    }

    fn prime(&mut self, input: f64) {
        self.filter.prime(input, input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_quality_changes_do_not_retune() {
        let mut notch = NotchFilter::new(50.0, 30.0, 100.0);
        assert!(!notch.retune(0.98));
        assert_eq!(notch.q(), 30.0);
    }

    #[test]
    fn noisy_signal_widens_the_notch() {
        let mut notch = NotchFilter::new(50.0, 30.0, 100.0);
        assert!(notch.retune(0.5));
        assert_eq!(notch.q(), 15.0);
        assert!(!notch.retune(0.52));
    }

    #[test]
    fn q_never_drops_below_floor() {
        let notch = NotchFilter::new(50.0, 30.0, 100.0);
        assert_eq!(notch.target_q(0.1), MIN_Q);
    }

    #[test]
    fn primed_notch_holds_constant() {
        let mut notch = NotchFilter::new(50.0, 30.0, 100.0);
        notch.prime(512.0);
        for _ in 0..100 {
            assert!((notch.process(512.0) - 512.0).abs() < 1e-9);
        }
    }
}
