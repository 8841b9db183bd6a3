use colored::Colorize;
use std::io::{self, BufRead, BufReader};
use std::net::TcpStream;

use super::export::write_recording;
use super::server::ADDRESS;
use crate::config::Config;
use crate::processing::{IngestOutcome, SampleReport, SignalEngine, SourceEvent};
use crate::utils::log::{describe_report, log_csv, log_to_file, log_with_header};

const BAR_WIDTH: usize = 60;
const LOG_FILE: &str = "client.log";
const BEATS_FILE: &str = "beats.csv";
const RECORDING_FILE: &str = "recording.csv";

fn bar(report: &SampleReport, engine: &SignalEngine) -> String {
    let filled = (engine.normalize(report.filtered) * BAR_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "|".repeat(filled),
        " ".repeat(BAR_WIDTH.saturating_sub(filled))
    );

    let marker = match report.beat {
        Some(beat) if beat.accepted => "♥".red(),
        Some(_) => "x".yellow(),
        None => " ".white(),
    };

    let heart_rate = if report.heart_rate > 0.0 {
        format!("{:5.1} BPM", report.heart_rate).green()
    } else {
        "  --- BPM".white()
    };

    format!("{} {} {}", marker, heart_rate, bar.cyan())
}

/// Connects to the line server, runs every line through the engine and draws
/// the filtered trace. The retained recording is exported when the stream ends.
pub fn run(config: &Config) -> io::Result<()> {
    let mut engine = SignalEngine::try_new(config.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let stream = TcpStream::connect(ADDRESS)?;
    let reader = BufReader::new(stream);
    let input_min = config.processor.input_min;
    let input_max = config.processor.input_max;
    let verbose = config.processor.verbose;
    let debug = config.processor.enable_debug_logging;

    if debug {
        log_with_header(
            LOG_FILE,
            "Session",
            &format!(
                "server: {}, fs: {} Hz, stages: {}, adaptive filtering: {}",
                ADDRESS,
                config.processor.fs,
                engine.filter().stage_names().join(" > "),
                config.filters.adaptive
            ),
        )?;
    }

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Failed to receive data: {}", e);
                break;
            }
        };

        let event = SourceEvent::parse(&line, input_min, input_max);
        match engine.handle(event) {
            IngestOutcome::Accepted(report) => {
                if report.contact_restored {
                    println!("{}", "Leads connected".green());
                }
                if debug {
                    if let Some(message) = describe_report(&report) {
                        log_to_file(LOG_FILE, &message)?;
                    }
                    if let Some(beat) = report.beat {
                        log_csv(
                            BEATS_FILE,
                            &["timestamp_ms", "rr_ms", "accepted", "heart_rate"],
                            &[
                                &beat.timestamp_ms.to_string(),
                                &beat.rr_interval_ms.map(|rr| rr.to_string()).unwrap_or_default(),
                                &beat.accepted.to_string(),
                                &beat.heart_rate.to_string(),
                            ],
                        )?;
                    }
                }
                if verbose {
                    println!("{}", bar(&report, &engine));
                }
            }
            IngestOutcome::ContactLost => {
                println!("{}", "Leads off - check electrodes".red());
                if debug {
                    log_to_file(LOG_FILE, "leads off")?;
                }
            }
            IngestOutcome::RangeReported { min, max } => {
                if debug {
                    log_to_file(LOG_FILE, &format!("device range {}..{}", min, max))?;
                }
            }
            IngestOutcome::Dropped => {
                if debug {
                    log_to_file(LOG_FILE, &format!("dropped line {:?} ({})", line, event))?;
                }
            }
        }
    }

    let rows = write_recording(&engine, RECORDING_FILE)?;
    println!(
        "Stream closed after {} samples, {} beats. Wrote {} rows to {}",
        engine.samples(),
        engine.beat_count(),
        rows,
        RECORDING_FILE
    );
    Ok(())
}
