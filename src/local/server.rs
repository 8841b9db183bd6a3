use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::simulator::SyntheticEcg;
use crate::config::Config;

pub const ADDRESS: &str = "127.0.0.1:8080";

// -----------------------------------------------------------------------------
// SIMULATED SOURCE
// -----------------------------------------------------------------------------

const SIMULATED_BPM: f64 = 72.0;
const DIAGNOSTIC_INTERVAL_S: f64 = 2.0;
// chance per second of the leads coming off
const LEADS_OFF_CHANCE: f64 = 0.02;
const LEADS_OFF_DURATION_S: f64 = 1.0;

/// Produces the protocol lines a single-lead acquisition board would send:
/// one sample per line, `!` while the leads are off, and a `D:min,max` range
/// report every couple of seconds.
pub struct SimulatedSource {
    ecg: SyntheticEcg,
    rng: StdRng,
    fs: f64,
    leads_off_remaining: usize,
    since_diagnostic: usize,
    window_min: f64,
    window_max: f64,
}

impl SimulatedSource {
    pub fn new(fs: f64, rng: StdRng) -> Self {
        Self {
            ecg: SyntheticEcg::new(fs, SIMULATED_BPM),
            rng,
            fs,
            leads_off_remaining: 0,
            since_diagnostic: 0,
            window_min: f64::INFINITY,
            window_max: f64::NEG_INFINITY,
        }
    }

    /// Lines for the next sample period.
    pub fn next_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2);

        if self.leads_off_remaining == 0 && self.rng.gen_bool(LEADS_OFF_CHANCE / self.fs) {
            self.leads_off_remaining = (LEADS_OFF_DURATION_S * self.fs) as usize;
        }

        let value = self.ecg.next_sample(&mut self.rng);
        if self.leads_off_remaining > 0 {
            self.leads_off_remaining -= 1;
            lines.push("!".to_string());
        } else {
            self.window_min = self.window_min.min(value);
            self.window_max = self.window_max.max(value);
            lines.push(format!("{}", value));
        }

        self.since_diagnostic += 1;
        if self.since_diagnostic as f64 >= DIAGNOSTIC_INTERVAL_S * self.fs {
            self.since_diagnostic = 0;
            if self.window_min <= self.window_max {
                lines.push(format!("D:{},{}", self.window_min, self.window_max));
            }
            self.window_min = f64::INFINITY;
            self.window_max = f64::NEG_INFINITY;
        }

        lines
    }
}

// -----------------------------------------------------------------------------
// RUN CODE
// -----------------------------------------------------------------------------

/// Serves the protocol over TCP at the configured sample rate. With `data`,
/// replays the lines of that file instead of simulating.
pub fn run(config: &Config, data: Option<&str>) -> io::Result<()> {
    let listener = TcpListener::bind(ADDRESS)?;
    println!("Serving on {} at {} Hz", ADDRESS, config.processor.fs);

    let recorded = match data {
        Some(path) => {
            let lines = read_lines(path)?;
            println!("Replaying {} lines from {}", lines.len(), path);
            Some(Arc::new(lines))
        }
        None => None,
    };

    let period = Duration::from_secs_f64(1.0 / config.processor.fs);
    let fs = config.processor.fs;

    for stream in listener.incoming() {
        let stream = stream?;
        let recorded = recorded.clone();
        thread::spawn(move || {
            let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
            println!("Client connected: {}", peer);
            let result = match recorded {
                Some(lines) => send_recorded(stream, &lines, period),
                None => simulated_loop(stream, fs, period),
            };
            if let Err(e) = result {
                println!("Client {} disconnected: {}", peer, e);
            }
        });
    }

    Ok(())
}

fn read_lines(path: &str) -> io::Result<Vec<String>> {
    BufReader::new(File::open(path)?)
        .lines()
        .collect::<io::Result<Vec<_>>>()
}

// SENDING DATA ----------------------------------------------------------------

fn send_recorded(mut stream: TcpStream, lines: &[String], period: Duration) -> io::Result<()> {
    for line in lines {
        writeln!(stream, "{}", line.trim())?;
        thread::sleep(period);
    }
    Ok(())
}

fn simulated_loop(mut stream: TcpStream, fs: f64, period: Duration) -> io::Result<()> {
    let mut source = SimulatedSource::new(fs, StdRng::from_entropy());
    loop {
        for line in source.next_lines() {
            writeln!(stream, "{}", line)?;
        }
        thread::sleep(period);
    }
}
