//! Destinations for collected counters.
//!
//! A sink receives one complete set of counters per successful collection.
//! Failed collections never reach a sink.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collector::pfctl::Counters;

/// Measurement name under which pf counters are reported.
pub const MEASUREMENT: &str = "pf";

/// One reported set of counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Report time (seconds since epoch).
    pub timestamp: i64,
    pub measurement: String,
    pub fields: Counters,
}

impl CounterRecord {
    pub fn now(measurement: &str, counters: &Counters) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            measurement: measurement.to_string(),
            fields: counters.clone(),
        }
    }
}

/// Receiver of complete counter sets.
pub trait CounterSink {
    fn report(&mut self, measurement: &str, counters: &Counters) -> io::Result<()>;
}

impl<S: CounterSink + ?Sized> CounterSink for &mut S {
    fn report(&mut self, measurement: &str, counters: &Counters) -> io::Result<()> {
        (**self).report(measurement, counters)
    }
}

/// Writes each record as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl JsonLinesSink<BufWriter<File>> {
    /// Appends to `path`, creating it if needed.
    pub fn append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CounterSink for JsonLinesSink<W> {
    fn report(&mut self, measurement: &str, counters: &Counters) -> io::Result<()> {
        let record = CounterRecord::now(measurement, counters);
        serde_json::to_writer(&mut self.writer, &record).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Logs counters through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl CounterSink for LogSink {
    fn report(&mut self, measurement: &str, counters: &Counters) -> io::Result<()> {
        info!(
            measurement,
            counters = counters.len(),
            "{}",
            format_fields(counters)
        );
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<CounterRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&CounterRecord> {
        self.records.last()
    }
}

impl CounterSink for MemorySink {
    fn report(&mut self, measurement: &str, counters: &Counters) -> io::Result<()> {
        self.records.push(CounterRecord::now(measurement, counters));
        Ok(())
    }
}

/// Formats counters as space-separated `key=value` pairs in key order.
pub fn format_fields(counters: &Counters) -> String {
    counters
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Counters {
        let mut counters = Counters::new();
        counters.insert("entries".to_string(), 2);
        counters.insert("match".to_string(), 11325);
        counters
    }

    #[test]
    fn test_json_lines_sink_writes_one_line_per_report() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.report(MEASUREMENT, &sample()).unwrap();
        sink.report(MEASUREMENT, &Counters::new()).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: CounterRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record.measurement, "pf");
        assert_eq!(record.fields, sample());
        assert!(record.timestamp > 0);
    }

    #[test]
    fn test_json_lines_sink_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pf.jsonl");

        for _ in 0..2 {
            let mut sink = JsonLinesSink::append(&path).unwrap();
            sink.report(MEASUREMENT, &sample()).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"match\":11325"));
    }

    fn report_to<S: CounterSink>(mut sink: S, counters: &Counters) {
        sink.report(MEASUREMENT, counters).unwrap();
    }

    #[test]
    fn test_memory_sink_through_mut_ref() {
        let mut sink = MemorySink::new();
        report_to(&mut sink, &sample());
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.last().unwrap().fields["entries"], 2);
    }

    #[test]
    fn test_format_fields() {
        assert_eq!(format_fields(&sample()), "entries=2 match=11325");
        assert_eq!(format_fields(&Counters::new()), "");
    }
}
