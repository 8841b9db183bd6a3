use rand::Rng;
use std::f64::consts::PI;

// -----------------------------------------------------------------------------
// SYNTHETIC ECG
// -----------------------------------------------------------------------------

const BASELINE: f64 = 512.0;
const MAINS_AMPLITUDE: f64 = 6.0;
const MAINS_HZ: f64 = 50.0;
const NOISE_AMPLITUDE: f64 = 5.0;

/// One deflection of the P-QRS-T complex, as a Gaussian bump.
struct Wave {
    amplitude: f64,
    // position and width as fractions of the beat period
    centre: f64,
    width: f64,
}

const COMPLEX: [Wave; 5] = [
    Wave { amplitude: 25.0, centre: 0.20, width: 0.030 },
    Wave { amplitude: -30.0, centre: 0.37, width: 0.010 },
    Wave { amplitude: 350.0, centre: 0.40, width: 0.012 },
    Wave { amplitude: -80.0, centre: 0.44, width: 0.012 },
    Wave { amplitude: 60.0, centre: 0.65, width: 0.060 },
];

/// Single-lead ECG generator on the 0–1023 ADC scale: a P-QRS-T template at a
/// fixed rate, plus mains pickup and uniform noise.
pub struct SyntheticEcg {
    fs: f64,
    bpm: f64,
    n: u64,
}

impl SyntheticEcg {
    pub fn new(fs: f64, bpm: f64) -> Self {
        Self { fs, bpm, n: 0 }
    }

    pub fn beat_period_s(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Noise-free value at sample `n`.
    pub fn clean_sample(&self, n: u64) -> f64 {
        let t = n as f64 / self.fs;
        let period = self.beat_period_s();
        // phase in 0..1 across one beat, scaled to a 1 s template
        let phase = (t % period) / period;

        COMPLEX.iter().fold(BASELINE, |acc, wave| {
            let d = (phase - wave.centre) * period.min(1.0) / wave.width;
            acc + wave.amplitude * (-0.5 * d * d).exp()
        })
    }

    pub fn next_sample<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let t = self.n as f64 / self.fs;
        let mains = MAINS_AMPLITUDE * (2.0 * PI * MAINS_HZ * t).cos();
        let noise = rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE);
        let value = self.clean_sample(self.n) + mains + noise;
        self.n += 1;
        value.round().clamp(0.0, 1023.0)
    }
}
