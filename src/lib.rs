pub mod config;
pub mod local;
pub mod processing;
pub mod utils;

#[cfg(feature = "python")]
pub mod bindings;

pub use config::Config;
pub use processing::{IngestOutcome, SignalEngine, SourceEvent};
