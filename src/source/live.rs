//! Live radar stream over a serial port.
//!
//! The sensor transmits newline-delimited text continuously, interleaving
//! telemetry samples with boot banners and console logging. A background
//! reader thread owns the open port, publishes each telemetry-tagged line to
//! the hand-off channel (console noise is dropped at the port, the same way
//! replay drops non-capture rows), and exits (releasing the port) on stop
//! request or on the first I/O failure after a successful open. There is no
//! auto-reconnect; reconnection policy belongs to the caller.

use crate::core::parser::TELEMETRY_TAG;
use crate::source::types::{RawLine, RecordKind};
use crate::source::{LineSource, SourceError, SourceEvent};
use crossbeam_channel::{unbounded, Receiver};
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Unbounded source reading a serial-attached sensor.
pub struct LiveSource {
    port_name: String,
    baud_rate: u32,
    read_timeout: Duration,
    stop_requested: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LiveSource {
    pub fn new(port_name: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            read_timeout,
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Device path of the port, e.g. `/dev/ttyUSB0`.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl LineSource for LiveSource {
    fn kind(&self) -> RecordKind {
        RecordKind::Telemetry
    }

    fn start(&mut self) -> Result<Receiver<SourceEvent>, SourceError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| SourceError::ConnectionError(e.to_string()))?;

        self.stop_requested.store(false, Ordering::SeqCst);
        let stop = self.stop_requested.clone();
        let (sender, receiver) = unbounded();

        let handle = thread::spawn(move || {
            // The thread owns the port; every exit path below drops it.
            let mut reader = BufReader::new(port);
            let mut buf: Vec<u8> = Vec::new();
            let mut index: u64 = 0;

            while !stop.load(Ordering::SeqCst) {
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => {
                        let fault =
                            SourceError::StreamInterrupted("device closed the stream".to_string());
                        let _ = sender.send(SourceEvent::Fault(fault));
                        break;
                    }
                    Ok(_) => {
                        if let Some(text) = decode_telemetry_line(&buf) {
                            let line = RawLine::new(index, text);
                            index += 1;
                            if sender.send(SourceEvent::Line(line)).is_err() {
                                break;
                            }
                        }
                        buf.clear();
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Quiet sensor; partial bytes stay in `buf` until the
                        // rest of the line arrives.
                        continue;
                    }
                    Err(e) => {
                        let _ = sender.send(SourceEvent::Fault(SourceError::StreamInterrupted(
                            e.to_string(),
                        )));
                        break;
                    }
                }
            }
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

/// Decode one raw frame from the port into a publishable telemetry line.
///
/// Invalid bytes are replaced, never fatal. Lines that do not carry the
/// telemetry tag (boot banners, console logging, blank lines) return `None`
/// and are dropped without counting against the stream.
fn decode_telemetry_line(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.starts_with(TELEMETRY_TAG) {
        return None;
    }
    Some(trimmed.to_string())
}
