use super::bandpass::BandPassFilter;
use super::low_pass::LowPassFilter;
use super::notch::NotchFilter;
use super::{blend_toward_raw, FilterStage};
use crate::config::FilterChainConfig;

const STAGE_RAW_WEIGHT: f64 = 0.2;
const STAGE_RAW_WEIGHT_LARGE: f64 = 0.5;
const OUTPUT_RAW_WEIGHT: f64 = 0.2;
const STRONG_SIGNAL_FACTOR: f64 = 2.0;

/// Outputs of each stage for the most recent sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageOutputs {
    pub notch: f64,
    pub bandpass: Option<f64>,
    pub low_pass: Option<f64>,
    pub output: f64,
}

/// Notch → bandpass → low-pass cascade with raw-signal blending.
///
/// Every stage output is pulled back toward the raw input (more so for large
/// excursions) and the chain output is blended once more, 80/20. The double
/// blend is kept as-is; whether it is wanted on real recordings is still open.
pub struct FilterChain {
    config: FilterChainConfig,
    fs: f64,
    adaptive: bool,
    notch: NotchFilter,
    bandpass: BandPassFilter,
    low_pass: LowPassFilter,
    primed: bool,
    samples_seen: usize,
    quality: f64,
    signal_threshold: f64,
    last: StageOutputs,
}

impl FilterChain {
    pub fn new(config: FilterChainConfig, fs: f64) -> Self {
        let notch = NotchFilter::new(config.notch_hz, config.notch_q, fs);
        let bandpass = BandPassFilter::new(config.band_low_hz, config.band_high_hz, fs);
        let low_pass = LowPassFilter::new(config.low_pass_smoothing);
        Self {
            adaptive: config.adaptive,
            config,
            fs,
            notch,
            bandpass,
            low_pass,
            primed: false,
            samples_seen: 0,
            quality: 1.0,
            signal_threshold: 0.0,
            last: StageOutputs::default(),
        }
    }

    /// Filters one sample. Non-finite input returns `0.0` and leaves every
    /// stage untouched.
    pub fn process(&mut self, raw: f64) -> f64 {
        if !raw.is_finite() {
            return 0.0;
        }

        if !self.primed {
            self.notch.prime(raw);
            self.bandpass.prime(raw);
            self.low_pass.prime(raw);
            self.primed = true;
        }
        self.samples_seen += 1;

        let threshold = self.signal_threshold;

        if raw.abs() > STRONG_SIGNAL_FACTOR * threshold {
            // Very strong deflection: keep its shape, skip the smoothing stages
            let notch = self.notch.process(raw);
            let stage = finite_or(blend_toward_raw(notch, raw, STAGE_RAW_WEIGHT), raw);
            let output = finite_or(blend_toward_raw(stage, raw, OUTPUT_RAW_WEIGHT), raw);
            self.last = StageOutputs {
                notch: stage,
                bandpass: None,
                low_pass: None,
                output,
            };
            return output;
        }

        let raw_weight = if raw.abs() > threshold {
            STAGE_RAW_WEIGHT_LARGE
        } else {
            STAGE_RAW_WEIGHT
        };

        let notch = finite_or(blend_toward_raw(self.notch.process(raw), raw, raw_weight), raw);
        let bandpass = finite_or(
            blend_toward_raw(self.bandpass.process(notch), raw, raw_weight),
            raw,
        );

        let smoothing = self.low_pass.select_smoothing(
            self.adaptive,
            threshold,
            self.quality,
            self.samples_seen,
        );
        self.low_pass.set_smoothing(smoothing);
        let low_pass = finite_or(
            blend_toward_raw(self.low_pass.process(bandpass), raw, raw_weight),
            raw,
        );

        let output = finite_or(blend_toward_raw(low_pass, raw, OUTPUT_RAW_WEIGHT), raw);
        self.last = StageOutputs {
            notch,
            bandpass: Some(bandpass),
            low_pass: Some(low_pass),
            output,
        };
        output
    }

    /// Takes a fresh quality score and signal threshold from the statistics
    /// tracker, retuning notch and bandpass if they moved past hysteresis.
    /// Returns whether any coefficients changed.
    pub fn apply_quality(&mut self, quality: f64, signal_threshold: f64) -> bool {
        if signal_threshold.is_finite() {
            self.signal_threshold = signal_threshold;
        }
        if !self.adaptive {
            return false;
        }

        self.quality = quality;
        let notch_retuned = self.notch.retune(quality);
        let bandpass_retuned = self.bandpass.retune(quality);
        notch_retuned || bandpass_retuned
    }

    pub fn set_adaptive(&mut self, adaptive: bool) {
        if self.adaptive == adaptive {
            return;
        }
        self.adaptive = adaptive;
        if !adaptive {
            // Back to the fixed design, history kept
            self.quality = 1.0;
            self.notch.retune(1.0);
            self.bandpass.retune(1.0);
            self.low_pass.set_smoothing(self.config.low_pass_smoothing);
        }
    }

    pub fn last_stages(&self) -> StageOutputs {
        self.last
    }

    /// Latest output of the low-pass stage itself, before raw blending.
    pub fn low_pass_output(&self) -> f64 {
        self.low_pass.output()
    }

    pub fn notch_q(&self) -> f64 {
        self.notch.q()
    }

    pub fn band_cutoffs(&self) -> (f64, f64) {
        self.bandpass.cutoffs()
    }

    /// Zeroes all history and rebuilds every stage from the configured
    /// defaults, including the adaptive mode.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone(), self.fs);
    }

    pub fn stage_names(&self) -> [&'static str; 3] {
        [self.notch.name(), self.bandpass.name(), self.low_pass.name()]
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
