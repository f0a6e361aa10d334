use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::summary::RunSummary;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Prints progress lines to stdout as they happen.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let mut stdout = io::stdout().lock();
        let _ = match event.elapsed {
            Some(elapsed) => writeln!(stdout, "{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => writeln!(stdout, "{}", event.message),
        };
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
