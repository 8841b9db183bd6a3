use std::fmt;

/// A line from the acquisition source, classified before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceEvent {
    Sample(f64),
    /// Electrodes are not making contact.
    LeadsOff,
    /// Periodic range report from the source side.
    Diagnostic { min: f64, max: f64 },
    /// Numeric, but outside the ADC reference domain.
    OutOfRange(f64),
    Malformed,
}

impl SourceEvent {
    /// Classifies one text line of the serial/TCP protocol:
    ///
    /// - `512`: a sample
    /// - `!`: leads disconnected
    /// - `D:<min>,<max>`: diagnostic range report
    ///
    /// Anything else, and non-finite numbers, are `Malformed`.
    pub fn parse(line: &str, input_min: f64, input_max: f64) -> Self {
        let line = line.trim();

        if line == "!" {
            return SourceEvent::LeadsOff;
        }

        if let Some(body) = line.strip_prefix("D:") {
            return parse_diagnostic(body).unwrap_or(SourceEvent::Malformed);
        }

        match line.parse::<f64>() {
            Ok(value) if !value.is_finite() => SourceEvent::Malformed,
            Ok(value) if value < input_min || value > input_max => SourceEvent::OutOfRange(value),
            Ok(value) => SourceEvent::Sample(value),
            Err(_) => SourceEvent::Malformed,
        }
    }
}

fn parse_diagnostic(body: &str) -> Option<SourceEvent> {
    let (min, max) = body.split_once(',')?;
    let min: f64 = min.trim().parse().ok()?;
    let max: f64 = max.trim().parse().ok()?;
    if !min.is_finite() || !max.is_finite() || min > max {
        return None;
    }
    Some(SourceEvent::Diagnostic { min, max })
}

impl fmt::Display for SourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEvent::Sample(value) => write!(f, "{}", value),
            SourceEvent::LeadsOff => write!(f, "!"),
            SourceEvent::Diagnostic { min, max } => write!(f, "D:{},{}", min, max),
            SourceEvent::OutOfRange(value) => write!(f, "{}", value),
            SourceEvent::Malformed => write!(f, "?"),
        }
    }
}
