pub mod buffer;
pub mod detectors;
pub mod filters;
pub mod input;
pub mod scaling;
pub mod signal_engine;
pub mod statistics;

pub use input::SourceEvent;
pub use signal_engine::{
    create_shared_engine, EngineSnapshot, IngestOutcome, SampleReport, SharedSignalEngine,
    SignalEngine,
};
