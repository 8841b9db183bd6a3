use crate::config::{load_config, Config};
use crate::processing::{IngestOutcome, SampleReport, SignalEngine, SourceEvent};

use std::collections::HashMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn report_to_map(report: &SampleReport) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    map.insert("index".to_string(), report.index as f64);
    map.insert("timestamp_ms".to_string(), report.timestamp_ms);
    map.insert("raw".to_string(), report.raw);
    map.insert("filtered".to_string(), report.filtered);
    map.insert("heart_rate".to_string(), report.heart_rate);
    let beat = report.beat.map_or(0.0, |b| if b.accepted { 1.0 } else { 0.0 });
    map.insert("beat".to_string(), beat);
    map
}

#[pyclass]
pub struct PySignalEngine {
    engine: SignalEngine,
}

#[pymethods]
impl PySignalEngine {
    #[new]
    #[pyo3(signature = (config_path=None))]
    pub fn new(config_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => load_config(&path).map_err(PyValueError::new_err)?,
            None => Config::default(),
        };
        let engine = SignalEngine::try_new(config).map_err(PyValueError::new_err)?;
        Ok(PySignalEngine { engine })
    }

    /// Processes one sample; returns the report, or None if it was dropped.
    pub fn ingest(&mut self, sample: f64) -> Option<HashMap<String, f64>> {
        match self.engine.ingest(sample) {
            IngestOutcome::Accepted(report) => Some(report_to_map(&report)),
            _ => None,
        }
    }

    /// Feeds one protocol line (`512`, `!`, `D:min,max`).
    pub fn handle_line(&mut self, line: &str) -> Option<HashMap<String, f64>> {
        let processor = &self.engine.config().processor;
        let event = SourceEvent::parse(line, processor.input_min, processor.input_max);
        match self.engine.handle(event) {
            IngestOutcome::Accepted(report) => Some(report_to_map(&report)),
            _ => None,
        }
    }

    pub fn run_chunk(&mut self, data: Vec<f64>) -> Vec<HashMap<String, f64>> {
        data.into_iter()
            .filter_map(|sample| match self.engine.ingest(sample) {
                IngestOutcome::Accepted(report) => Some(report_to_map(&report)),
                _ => None,
            })
            .collect()
    }

    pub fn mark_leads_off(&mut self) -> bool {
        self.engine.mark_leads_off()
    }

    pub fn apply_device_range(&mut self, min: f64, max: f64) {
        self.engine.apply_device_range(min, max);
    }

    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.engine.set_adaptive(adaptive);
    }

    #[pyo3(signature = (threshold=None))]
    pub fn set_fixed_threshold(&mut self, threshold: Option<f64>) {
        self.engine.set_fixed_threshold(threshold);
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    pub fn heart_rate(&self) -> f64 {
        self.engine.heart_rate()
    }

    pub fn contact(&self) -> bool {
        self.engine.contact()
    }

    pub fn range(&self) -> (f64, f64) {
        self.engine.range()
    }

    pub fn quality(&self) -> f64 {
        self.engine.quality()
    }

    /// The last `count` (raw, filtered) pairs, oldest first.
    pub fn latest(&self, count: usize) -> Vec<(f64, f64)> {
        self.engine.latest(count).collect()
    }
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn cardiac_signal_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySignalEngine>()?;
    Ok(())
}
