// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub filters: FilterChainConfig,
    pub statistics: StatisticsConfig,
    pub detector: PeakDetectorConfig,
    pub range: RangeConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessorConfig {
    pub verbose: bool,
    pub fs: f64,
    pub buffer_capacity: usize,
    pub enable_debug_logging: bool,
    // Reference domain of the acquisition ADC, checked at the input boundary
    pub input_min: f64,
    pub input_max: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            fs: 100.0,
            buffer_capacity: 5000,
            enable_debug_logging: false,
            input_min: 0.0,
            input_max: 1023.0,
        }
    }
}

impl ProcessorConfig {
    pub fn sample_period_ms(&self) -> f64 {
        1000.0 / self.fs
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FilterChainConfig {
    pub notch_hz: f64,
    pub notch_q: f64,
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    pub low_pass_smoothing: f64,
    pub adaptive: bool,
}

impl Default for FilterChainConfig {
    fn default() -> Self {
        Self {
            notch_hz: 50.0,
            notch_q: 30.0,
            band_low_hz: 0.5,
            band_high_hz: 40.0,
            low_pass_smoothing: 0.2,
            adaptive: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StatisticsConfig {
    pub history_size: usize,
    pub update_interval: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            history_size: 200,
            update_interval: 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PeakDetectorConfig {
    pub min_beat_spacing_ms: f64,
    pub min_rr_ms: f64,
    pub max_rr_ms: f64,
    pub rr_history: usize,
    /// Pins the detection threshold instead of deriving it from a min/max range.
    pub fixed_threshold: Option<f64>,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            min_beat_spacing_ms: 200.0,
            min_rr_ms: 300.0,
            max_rr_ms: 1500.0,
            rr_history: 5,
            fixed_threshold: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RangeConfig {
    pub update_interval: usize,
    pub scan_window: usize,
    pub min_valid_samples: usize,
    pub initial_min: f64,
    pub initial_max: f64,
    pub min_span: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            update_interval: 100,
            scan_window: 500,
            min_valid_samples: 50,
            initial_min: 0.0,
            initial_max: 1023.0,
            min_span: 10.0,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let config_str =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    parse_config(&config_str)
}

pub fn parse_config(yaml: &str) -> Result<Config, String> {
    let config: Config =
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse config file: {}", e))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), String> {
    let yaml =
        serde_yaml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, yaml).map_err(|e| format!("Failed to write config file: {}", e))
}

impl Config {
    /// Rejects settings the engine cannot run with (zero-sized windows, a
    /// non-positive sample rate, inverted bands).
    pub fn validate(&self) -> Result<(), String> {
        if !(self.processor.fs > 0.0) {
            return Err(format!("Invalid sample rate: {}", self.processor.fs));
        }
        if self.processor.buffer_capacity == 0 {
            return Err("buffer_capacity must be greater than zero".to_string());
        }
        if self.statistics.history_size == 0 || self.statistics.update_interval == 0 {
            return Err("statistics windows must be greater than zero".to_string());
        }
        if self.detector.rr_history == 0 {
            return Err("rr_history must be greater than zero".to_string());
        }
        if self.detector.min_rr_ms >= self.detector.max_rr_ms {
            return Err(format!(
                "Invalid RR interval bounds: {} >= {}",
                self.detector.min_rr_ms, self.detector.max_rr_ms
            ));
        }
        if self.range.update_interval == 0 || self.range.scan_window == 0 {
            return Err("range windows must be greater than zero".to_string());
        }
        if self.range.min_valid_samples > self.range.scan_window {
            return Err(format!(
                "min_valid_samples ({}) exceeds scan_window ({})",
                self.range.min_valid_samples, self.range.scan_window
            ));
        }
        if !(self.filters.band_low_hz > 0.0 && self.filters.band_low_hz < self.filters.band_high_hz)
        {
            return Err(format!(
                "Invalid bandpass cutoffs: {} - {} Hz",
                self.filters.band_low_hz, self.filters.band_high_hz
            ));
        }
        if !(self.filters.notch_q > 0.0) {
            return Err(format!("Invalid notch Q: {}", self.filters.notch_q));
        }
        Ok(())
    }
}
