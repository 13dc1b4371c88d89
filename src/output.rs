use std::io::{self, Write};

use crate::app::{DownloadReport, ProgressEvent, ProgressLevel, ProgressSink};

/// Status lines to stdout, warnings to stderr.
pub struct ConsoleOutput;

impl ConsoleOutput {
    /// Lists the batch's failed transfers on stderr.
    pub fn print_summary(report: &DownloadReport) -> io::Result<()> {
        if report.is_clean() {
            return Ok(());
        }
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "Failed to download {} file(s):", report.failures.len())?;
        for failure in &report.failures {
            writeln!(stderr, "  {}: {}", failure.target, failure.reason)?;
        }
        Ok(())
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.level {
            ProgressLevel::Info => println!("{}", event.message),
            ProgressLevel::Warning => eprintln!("{}", event.message),
        }
    }
}
