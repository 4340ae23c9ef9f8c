//! Record types shared by the replay and live ingestion paths.
//!
//! A `RawLine` is the unit handed from a source to the pipeline; it dies after
//! one parse attempt. Parsed records live until the window evicts them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of record a source produces and a window holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// CSI subcarrier amplitudes from a stored capture.
    Amplitude,
    /// Radar presence telemetry from the live serial stream.
    Telemetry,
}

/// One raw line (or CSV row payload) plus its arrival order index.
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Arrival order, assigned by the source.
    pub index: u64,
    /// The text to parse.
    pub text: String,
    /// Capture timestamp from the stored batch, if the source had one.
    /// Live sources leave this `None`; arrival time is assigned at parse time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawLine {
    pub fn new(index: u64, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// One CSI packet: per-subcarrier amplitudes computed from interleaved
/// real/imaginary pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmplitudeRecord {
    /// Capture timestamp (or arrival time when the capture had none).
    pub timestamp: DateTime<Utc>,
    /// `amplitude_i = sqrt(real_i^2 + imag_i^2)`, fixed length per session.
    pub amplitudes: Vec<f64>,
}

impl AmplitudeRecord {
    /// Number of subcarriers in this record.
    pub fn subcarrier_count(&self) -> usize {
        self.amplitudes.len()
    }
}

/// One radar telemetry sample from the live stream.
///
/// The sequence number is informational only: it may wrap or reset across
/// sensor reboots, so window ordering is always by arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Sensor-reported sequence number.
    pub sequence: i64,
    /// Sensor-reported timestamp (device clock, opaque units).
    pub device_timestamp: i64,
    /// Arrival time, assigned by the pipeline.
    pub received_at: DateTime<Utc>,
    /// Wander value.
    pub wander: f64,
    /// Jitter value.
    pub jitter: f64,
    /// Room-presence heuristic: wander or jitter above its threshold.
    pub room: bool,
    /// Raw motion flag as reported by the sensor.
    pub motion: bool,
}

/// A parsed record of either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Record {
    Amplitude(AmplitudeRecord),
    Telemetry(TelemetryRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Amplitude(_) => RecordKind::Amplitude,
            Record::Telemetry(_) => RecordKind::Telemetry,
        }
    }
}
