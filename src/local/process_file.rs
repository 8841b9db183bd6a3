use colored::Colorize;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::Config;
use crate::processing::{IngestOutcome, SignalEngine, SourceEvent};
use crate::utils::log::{describe_report, log_to_file};

/// Per-file totals from an offline run.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub samples: usize,
    pub dropped: usize,
    pub contact_losses: usize,
    pub beats: usize,
    pub heart_rate: f64,
}

/// `recording.csv` -> `recording_processed.csv`, next to the input.
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    input.with_file_name(format!("{}_processed.csv", stem))
}

/// Replays one recorded line stream through a fresh engine and writes
/// `index,timestamp_ms,raw,filtered,heart_rate` for each accepted sample.
///
/// Only the first comma-separated field of each line is read, so both bare
/// protocol captures and multi-column CSV exports work. A non-numeric first
/// line is taken as a header and skipped.
pub fn process_recording(input: &Path, output: &Path, config: &Config) -> io::Result<FileSummary> {
    let mut engine = SignalEngine::try_new(config.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let reader = BufReader::new(File::open(input)?);
    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(["index", "timestamp_ms", "raw", "filtered", "heart_rate"])?;

    let log_name = format!(
        "{}.log",
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let debug = config.processor.enable_debug_logging;

    let mut summary = FileSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        samples: 0,
        dropped: 0,
        contact_losses: 0,
        beats: 0,
        heart_rate: 0.0,
    };

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        // Diagnostic lines carry their own comma
        let field = if line.trim_start().starts_with("D:") {
            line.as_str()
        } else {
            line.split(',').next().unwrap_or("")
        };

        let event = SourceEvent::parse(
            field,
            config.processor.input_min,
            config.processor.input_max,
        );
        if line_number == 0 && event == SourceEvent::Malformed {
            continue;
        }

        match engine.handle(event) {
            IngestOutcome::Accepted(report) => {
                summary.samples += 1;
                if report.beat.map_or(false, |b| b.accepted) {
                    summary.beats += 1;
                }
                if debug {
                    if let Some(message) = describe_report(&report) {
                        log_to_file(&log_name, &message)?;
                    }
                }
                writer.write_record([
                    report.index.to_string(),
                    report.timestamp_ms.to_string(),
                    report.raw.to_string(),
                    report.filtered.to_string(),
                    report.heart_rate.to_string(),
                ])?;
            }
            IngestOutcome::ContactLost => {
                summary.contact_losses += 1;
                if debug {
                    log_to_file(&log_name, &format!("leads off after {} samples", summary.samples))?;
                }
            }
            IngestOutcome::RangeReported { .. } => {}
            IngestOutcome::Dropped => summary.dropped += 1,
        }
    }

    writer.flush()?;
    summary.heart_rate = engine.heart_rate();
    Ok(summary)
}

/// Processes every file in parallel, one engine per file.
pub fn run(paths: &[String], config: &Config) -> io::Result<()> {
    if paths.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no input files given",
        ));
    }

    let start_time = Instant::now();
    let results: Vec<(String, io::Result<FileSummary>)> = paths
        .par_iter()
        .map(|path| {
            let input = Path::new(path);
            let output = output_path_for(input);
            (path.clone(), process_recording(input, &output, config))
        })
        .collect();

    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(summary) => println!(
                "{} {} -> {} ({} samples, {} dropped, {} beats, {} contact losses, HR {:.1} BPM)",
                "Processed".green(),
                path,
                summary.output.display(),
                summary.samples,
                summary.dropped,
                summary.beats,
                summary.contact_losses,
                summary.heart_rate
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "Failed".red(), path, e);
            }
        }
    }

    println!(
        "Finished {} file(s) in {:?}",
        paths.len(),
        start_time.elapsed()
    );

    if failures > 0 {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} file(s) failed", failures),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn output_sits_next_to_input() {
        assert_eq!(
            output_path_for(Path::new("/data/session_3.csv")),
            PathBuf::from("/data/session_3_processed.csv")
        );
    }

    #[test]
    fn replays_protocol_capture() {
        let dir = std::env::temp_dir();
        let input = dir.join("cardiac_replay_capture.csv");
        let output = dir.join("cardiac_replay_capture_processed.csv");
        {
            let mut file = File::create(&input).unwrap();
            writeln!(file, "value").unwrap();
            for i in 0..300 {
                writeln!(file, "{}", 500 + i % 5).unwrap();
            }
            writeln!(file, "!").unwrap();
            writeln!(file, "D:300,800").unwrap();
            writeln!(file, "oops").unwrap();
            writeln!(file, "2000").unwrap();
            writeln!(file, "505,extra").unwrap();
        }

        let summary = process_recording(&input, &output, &Config::default()).unwrap();
        assert_eq!(summary.samples, 301);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.contact_losses, 1);

        let rows = csv::Reader::from_path(&output).unwrap().records().count();
        assert_eq!(rows, 301);

        std::fs::remove_file(input).ok();
        std::fs::remove_file(output).ok();
    }

    #[test]
    fn unusable_config_is_an_input_error() {
        let mut config = Config::default();
        config.statistics.update_interval = 0;
        let output = std::env::temp_dir().join("cardiac_unusable_config_processed.csv");
        let err = process_recording(Path::new("missing.csv"), &output, &config).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!output.exists());
    }
}
