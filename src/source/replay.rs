//! Replay of a stored CSI capture.
//!
//! Captures are CSV files with at least `type`, `timestamp` and `data` columns.
//! Only rows whose `type` matches the CSI tag are replayed; everything else in
//! the file is skipped silently. The replay is finite and restartable: each
//! `start()` opens the file fresh and yields rows in stored order.

use crate::source::types::{RawLine, RecordKind};
use crate::source::{LineSource, SourceError, SourceEvent};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use crossbeam_channel::{unbounded, Receiver};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Row tag for CSI packets in a capture file.
pub const CSI_ROW_TAG: &str = "CSI_DATA";

/// Finite source replaying a stored capture file.
pub struct ReplaySource {
    path: PathBuf,
    stop_requested: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Path of the capture being replayed.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LineSource for ReplaySource {
    fn kind(&self) -> RecordKind {
        RecordKind::Amplitude
    }

    fn start(&mut self) -> Result<Receiver<SourceEvent>, SourceError> {
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| SourceError::SourceUnreadable(e.to_string()))?;

        // Resolve column positions up front so a capture with a wrong layout
        // fails before any row is produced.
        let headers = reader
            .headers()
            .map_err(|e| SourceError::SourceUnreadable(e.to_string()))?;
        let columns = CaptureColumns::locate(headers)?;

        self.stop_requested.store(false, Ordering::SeqCst);
        let stop = self.stop_requested.clone();
        let (sender, receiver) = unbounded();

        let handle = thread::spawn(move || {
            let mut index: u64 = 0;
            for row in reader.records() {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                let row = match row {
                    Ok(row) => row,
                    Err(e) => {
                        // A single undecodable row is skipped, not fatal.
                        eprintln!("Skipping unreadable capture row: {e}");
                        continue;
                    }
                };
                if row.get(columns.row_type) != Some(CSI_ROW_TAG) {
                    continue;
                }

                let text = row.get(columns.data).unwrap_or_default().to_string();
                let mut line = RawLine::new(index, text);
                if let Some(ts) = row.get(columns.timestamp).and_then(parse_capture_timestamp) {
                    line = line.with_timestamp(ts);
                }
                index += 1;

                if sender.send(SourceEvent::Line(line)).is_err() {
                    break;
                }
            }
            // Dropping the sender marks end-of-sequence, not an error.
        });

        self.handle = Some(handle);
        Ok(receiver)
    }

    fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Positions of the required capture columns.
struct CaptureColumns {
    row_type: usize,
    timestamp: usize,
    data: usize,
}

impl CaptureColumns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, SourceError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| SourceError::SourceUnreadable(format!("missing column '{name}'")))
        };
        Ok(Self {
            row_type: find("type")?,
            timestamp: find("timestamp")?,
            data: find("data")?,
        })
    }
}

/// Best-effort parse of the capture's timestamp column.
///
/// Accepts RFC 3339, a plain `YYYY-MM-DD HH:MM:SS[.fff]` datetime, or epoch
/// seconds. Rows with an unparseable timestamp keep their data and fall back
/// to arrival time downstream.
fn parse_capture_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(epoch) = value.parse::<f64>() {
        let millis = (epoch * 1000.0) as i64;
        return Utc.timestamp_millis_opt(millis).single();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_capture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).expect("create capture");
        file.write_all(contents.as_bytes()).expect("write capture");
        path
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let mut source = ReplaySource::new("/nonexistent/capture.csv");
        match source.start() {
            Err(SourceError::SourceUnreadable(_)) => {}
            other => panic!("expected SourceUnreadable, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_is_unreadable() {
        let path = write_capture("motionsense-badcols.csv", "type,timestamp\nCSI_DATA,1\n");
        let mut source = ReplaySource::new(&path);
        match source.start() {
            Err(SourceError::SourceUnreadable(msg)) => assert!(msg.contains("data")),
            other => panic!("expected SourceUnreadable, got {other:?}"),
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_replay_filters_and_orders_rows() {
        let path = write_capture(
            "motionsense-replay.csv",
            "type,timestamp,data\n\
             CSI_DATA,2026-02-10 11:00:53.306,\"[3, 4]\"\n\
             DEBUG,2026-02-10 11:00:53.400,noise\n\
             CSI_DATA,2026-02-10 11:00:53.500,\"[0, 0]\"\n",
        );
        let mut source = ReplaySource::new(&path);
        let receiver = source.start().expect("start replay");

        let mut lines = Vec::new();
        while let Ok(event) = receiver.recv() {
            match event {
                SourceEvent::Line(line) => lines.push(line),
                SourceEvent::Fault(e) => panic!("unexpected fault: {e}"),
            }
        }

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "[3, 4]");
        assert_eq!(lines[1].text, "[0, 0]");
        assert_eq!(lines[0].index, 0);
        assert_eq!(lines[1].index, 1);
        assert!(lines[0].timestamp.is_some());

        source.stop();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_capture_timestamp_formats() {
        assert!(parse_capture_timestamp("2026-02-10 11:00:53.306").is_some());
        assert!(parse_capture_timestamp("2026-02-10T11:00:53.306Z").is_some());
        assert!(parse_capture_timestamp("1760000000.5").is_some());
        assert!(parse_capture_timestamp("not-a-time").is_none());
    }
}
