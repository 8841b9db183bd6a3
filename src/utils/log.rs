use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::processing::SampleReport;

const LOG_DIR: &str = "logs";

fn log_path(filename: &str) -> io::Result<PathBuf> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }
    Ok(Path::new(LOG_DIR).join(filename))
}

/// Logs a message to a file with timestamp
///
/// # Arguments
///
/// * `filename` - The name of the log file (created under `logs/`)
/// * `message` - The message to log
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(filename)?)?;

    writeln!(
        file,
        "[{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        message
    )?;
    file.flush()
}

/// Logs a message under a formatted header
pub fn log_with_header(filename: &str, header: &str, message: &str) -> io::Result<()> {
    let formatted_message = format!("===== {} =====\n{}\n====================", header, message);
    log_to_file(filename, &formatted_message)
}

/// Appends a row to a CSV file under `logs/`, writing `headers` first if the
/// file is new
pub fn log_csv(filename: &str, headers: &[&str], data: &[&str]) -> io::Result<()> {
    let path = log_path(filename)?;
    let file_exists = path.exists();

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if !file_exists && !headers.is_empty() {
        writeln!(file, "{}", headers.join(","))?;
    }

    writeln!(file, "{}", data.join(","))?;
    file.flush()
}

/// Debug line for the notable parts of a sample report, if any.
pub fn describe_report(report: &SampleReport) -> Option<String> {
    let mut parts = Vec::new();

    if report.contact_restored {
        parts.push("contact restored".to_string());
    }
    if let Some(beat) = &report.beat {
        parts.push(match beat.rr_interval_ms {
            Some(rr) if beat.accepted => format!("beat rr={:.0}ms hr={:.1}", rr, beat.heart_rate),
            Some(rr) => format!("beat rejected rr={:.0}ms", rr),
            None => "first beat".to_string(),
        });
    }
    if report.filters_retuned {
        parts.push("filters retuned".to_string());
    }
    if report.range_updated {
        parts.push("display range updated".to_string());
    }

    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "index: {}, t: {:.0}ms, raw: {}, filtered: {:.2} - {}",
        report.index,
        report.timestamp_ms,
        report.raw,
        report.filtered,
        parts.join(", ")
    ))
}
