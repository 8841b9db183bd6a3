use std::f64::consts::PI;

// Design frequencies are kept below this fraction of fs so the poles stay
// inside the unit circle.
const MAX_DESIGN_FRACTION: f64 = 0.45;

/// Two-pole, two-zero IIR section with two samples of input and output history.
#[derive(Clone, Debug)]
pub struct SecondOrderFilter {
    a: [f64; 3],
    b: [f64; 3],
    x: [f64; 2],
    y: [f64; 2],
}

impl SecondOrderFilter {
    pub fn notch(f0: f64, fs: f64, q: f64) -> Self {
        let omega = 2.0 * PI * clamp_design_frequency(f0, fs) / fs;
        let alpha = f64::sin(omega) / (2.0 * q);
        let cos = f64::cos(omega);

        Self::from_coefficients(
            [1.0, -2.0 * cos, 1.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    /// Constant 0 dB peak-gain bandpass with its -3 dB corners at `f_low` and `f_high`.
    pub fn bandpass(f_low: f64, f_high: f64, fs: f64) -> Self {
        let f_high = clamp_design_frequency(f_high, fs);
        let f_low = f_low.min(f_high * 0.5);
        let f0 = (f_low * f_high).sqrt();
        let q = f0 / (f_high - f_low);

        let omega = 2.0 * PI * f0 / fs;
        let alpha = f64::sin(omega) / (2.0 * q);
        let cos = f64::cos(omega);

        Self::from_coefficients(
            [alpha, 0.0, -alpha],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    /// Critically damped smoother: two cascaded one-pole stages that each keep
    /// `smoothing` of their previous output. Unity gain at DC.
    pub fn smoother(smoothing: f64) -> Self {
        let c = smoothing.clamp(0.0, 0.999);
        let g = (1.0 - c) * (1.0 - c);

        Self::from_coefficients([g, 0.0, 0.0], [1.0, -2.0 * c, c * c])
    }

    fn from_coefficients(b: [f64; 3], a: [f64; 3]) -> Self {
        // Normalise once so the per-sample path has no divisions
        let a0 = a[0];
        SecondOrderFilter {
            a: [1.0, a[1] / a0, a[2] / a0],
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            x: [0.0, 0.0],
            y: [0.0, 0.0],
        }
    }

    /// Swaps in the coefficients of `other`, keeping this section's history.
    pub fn retune(&mut self, other: &SecondOrderFilter) {
        self.a = other.a;
        self.b = other.b;
    }

    pub fn calculate_output(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.b[1] * self.x[0] + self.b[2] * self.x[1]
            - self.a[1] * self.y[0]
            - self.a[2] * self.y[1];

        if !output.is_finite() {
            // Overflowed on an extreme input; restart from the input value
            self.prime(input, input);
            return input;
        }

        self.x[1] = self.x[0];
        self.x[0] = input;
        self.y[1] = self.y[0];
        self.y[0] = output;

        output
    }

    /// Fills the history as if `input` had been applied forever and produced `output`.
    pub fn prime(&mut self, input: f64, output: f64) {
        self.x = [input, input];
        self.y = [output, output];
    }

    pub fn dc_gain(&self) -> f64 {
        let den = self.a[0] + self.a[1] + self.a[2];
        if den.abs() < f64::EPSILON {
            return 1.0;
        }
        (self.b[0] + self.b[1] + self.b[2]) / den
    }

    /// Most recent output and the one before it.
    pub fn previous_outputs(&self) -> (f64, f64) {
        (self.y[0], self.y[1])
    }
}

fn clamp_design_frequency(f: f64, fs: f64) -> f64 {
    f.min(MAX_DESIGN_FRACTION * fs)
}
