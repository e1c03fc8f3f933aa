// src/log_sink.rs

//! # Log Sink Seam
//!
//! The state aggregator and every sensor append one record per update:
//! a timestamp plus named float columns. Where those records end up (CSV
//! files, telemetry) is left to the [`LogSink`] implementation.

use std::sync::{Arc, Mutex, PoisonError};

/// Append-only sink for timestamped float records.
pub trait LogSink: Send {
    /// Appends one record.
    fn log(&mut self, time: f64, columns: &[f64]);
}

/// Builds the sink for a named log with the given column names.
pub type LogFactory<'a> = dyn FnMut(&str, &'static [&'static str]) -> Box<dyn LogSink> + 'a;

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn log(&mut self, _time: f64, _columns: &[f64]) {}
}

/// Forwards records to the `log` facade at trace level, one CSV line each.
#[derive(Debug, Clone)]
pub struct TraceLog {
    target: String,
}

impl TraceLog {
    /// Creates a sink that logs under `name`, announcing its header once.
    pub fn new(name: &str, header: &'static [&'static str]) -> Self {
        log::debug!("{}: time,{}", name, header.join(","));
        Self {
            target: name.to_owned(),
        }
    }
}

impl LogSink for TraceLog {
    fn log(&mut self, time: f64, columns: &[f64]) {
        if log::log_enabled!(log::Level::Trace) {
            let line = columns
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(",");
            log::trace!("{}: {},{}", self.target, time, line);
        }
    }
}

/// One record captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Record timestamp.
    pub time: f64,
    /// Column values in header order.
    pub columns: Vec<f64>,
}

/// Keeps every record in memory. Clones share the same record list.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out every record appended so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemoryLog {
    fn log(&mut self, time: f64, columns: &[f64]) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogRecord {
                time,
                columns: columns.to_vec(),
            });
    }
}
