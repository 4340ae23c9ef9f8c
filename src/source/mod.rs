//! Telemetry sources for the ingestion pipeline.
//!
//! Two source variants share one capability surface: a started source produces
//! a lazy sequence of `RawLine`s on a hand-off channel, read by the pipeline.
//!
//! - [`ReplaySource`]: finite, deterministic replay of a stored CSI capture.
//! - [`LiveSource`]: unbounded stream from a serial-attached radar sensor.

pub mod live;
pub mod replay;
pub mod types;

use crossbeam_channel::Receiver;

// Re-export commonly used types
pub use live::LiveSource;
pub use replay::ReplaySource;
pub use types::{AmplitudeRecord, RawLine, Record, RecordKind, TelemetryRecord};

/// Terminal source failures. All of these are fatal to the pipeline; per-record
/// problems are `ParseError`s and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The stored capture could not be opened or decoded at all.
    SourceUnreadable(String),
    /// The live device could not be opened.
    ConnectionError(String),
    /// The live device failed after a successful open.
    StreamInterrupted(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::SourceUnreadable(e) => write!(f, "capture unreadable: {e}"),
            SourceError::ConnectionError(e) => write!(f, "cannot open device: {e}"),
            SourceError::StreamInterrupted(e) => write!(f, "stream interrupted: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// What a producer publishes on the hand-off channel.
///
/// A `Fault` is always the last event a producer sends; dropping the sender
/// without a fault marks natural end-of-sequence.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Line(RawLine),
    Fault(SourceError),
}

/// A started source yields raw lines through a channel until it ends, faults,
/// or is stopped.
pub trait LineSource {
    /// The record kind this source produces.
    fn kind(&self) -> RecordKind;

    /// Open the underlying device/file and start producing.
    ///
    /// Fails fast (before any line is produced) with `SourceUnreadable` or
    /// `ConnectionError`. On success the producer runs on its own thread and
    /// the returned receiver carries its events.
    fn start(&mut self) -> Result<Receiver<SourceEvent>, SourceError>;

    /// Ask the producer to stop. The underlying handle is released when the
    /// producer thread observes the request and exits.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::StreamInterrupted("read failed".to_string());
        assert_eq!(err.to_string(), "stream interrupted: read failed");

        let err = SourceError::ConnectionError("no such device".to_string());
        assert!(err.to_string().contains("cannot open device"));
    }
}
