//! Diagnostic sink for per-request decision milestones.
//!
//! The rewrite pipeline reports what it found and what it decided through a
//! [`Diagnostics`] handle instead of process-global logging state. Sinks
//! must tolerate concurrent writers; a single request emits its lines in
//! order from one task, so per-request ordering is preserved.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Severity of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
}

/// Destination for diagnostic lines.
///
/// Implementations must never fail the caller: write errors are dropped.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);
}

/// Forwards diagnostics to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!(target: "streamgate::diagnostics", "{}", message),
            Severity::Warn => warn!(target: "streamgate::diagnostics", "{}", message),
        }
    }
}

/// Appends `[YYYY-MM-DD HH:MM:SS] message` lines to a file.
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl DiagnosticSink for FileSink {
    fn emit(&self, severity: Severity, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = match severity {
            Severity::Info => format!("[{timestamp}] {message}\n"),
            Severity::Warn => format!("[{timestamp}] WARN {message}\n"),
        };

        // A poisoned lock only means another writer panicked mid-line
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        let _ = file.write_all(line.as_bytes());
    }
}

/// Keeps every line in memory. Used by tests to assert on milestones.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded lines in emission order
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Recorded warnings only
    pub fn warnings(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == Severity::Warn)
            .map(|(_, m)| m)
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, severity: Severity, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((severity, message.to_string()));
    }
}

/// Fan-out handle passed into the rewrite pipeline
#[derive(Clone, Default)]
pub struct Diagnostics {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl Diagnostics {
    /// Diagnostics that go nowhere
    pub fn silent() -> Self {
        Self::default()
    }

    /// Diagnostics routed to the tracing subscriber
    pub fn tracing() -> Self {
        Self::silent().with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.emit(Severity::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(Severity::Warn, message.as_ref());
    }

    fn emit(&self, severity: Severity, message: &str) {
        for sink in &self.sinks {
            sink.emit(severity, message);
        }
    }
}
