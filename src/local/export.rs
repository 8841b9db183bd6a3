use std::io;
use std::path::Path;

use crate::processing::SignalEngine;

// -----------------------------------------------------------------------------
// RECORDING EXPORT
// -----------------------------------------------------------------------------

/// Writes every retained (raw, filtered) pair, oldest first, as `raw,filtered`
/// CSV. Returns the number of rows written.
pub fn write_recording<P: AsRef<Path>>(engine: &SignalEngine, path: P) -> io::Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["raw", "filtered"])?;

    let mut rows = 0;
    for (raw, filtered) in engine.recording() {
        writer.write_record([raw.to_string(), filtered.to_string()])?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}
