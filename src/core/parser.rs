//! Line parsing into typed records.
//!
//! One `RawLine` in, one `Record` or one named `ParseError` out. Parse failures
//! are values for the caller to log and count; a bad line never stops the
//! stream. The parser carries the only piece of per-session state: the
//! subcarrier count established by the first amplitude record.

use crate::config::RoomThresholds;
use crate::source::types::{AmplitudeRecord, RawLine, Record, RecordKind, TelemetryRecord};
use chrono::Utc;

/// Line prefix emitted by the radar firmware for telemetry samples.
pub const TELEMETRY_TAG: &str = "RADAR_DADA";

/// Minimum comma-separated fields in a telemetry line.
const TELEMETRY_MIN_FIELDS: usize = 11;

// Field positions within a telemetry line.
const FIELD_SEQUENCE: usize = 1;
const FIELD_DEVICE_TIMESTAMP: usize = 2;
const FIELD_WANDER: usize = 3;
const FIELD_JITTER: usize = 7;
const FIELD_MOTION: usize = 9;

/// Per-record parse failures. All recoverable: the pipeline logs, counts and
/// moves on.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The text could not be decoded into a numeric sequence.
    MalformedSequence(String),
    /// The decoded sequence has odd length and cannot split into pairs.
    OddLength { len: usize },
    /// The record disagrees with the session's established subcarrier count.
    LengthMismatch { expected: usize, actual: usize },
    /// The line does not begin with the expected tag.
    UnrecognizedPrefix,
    /// Fewer delimited fields than the format requires.
    FieldCountMismatch { required: usize, actual: usize },
    /// A required field could not be converted to its numeric type.
    FieldTypeError { field: &'static str, value: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MalformedSequence(e) => write!(f, "malformed numeric sequence: {e}"),
            ParseError::OddLength { len } => {
                write!(f, "sequence of length {len} cannot split into real/imag pairs")
            }
            ParseError::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} subcarriers, record has {actual}")
            }
            ParseError::UnrecognizedPrefix => write!(f, "line does not start with {TELEMETRY_TAG}"),
            ParseError::FieldCountMismatch { required, actual } => {
                write!(f, "telemetry line has {actual} fields, {required} required")
            }
            ParseError::FieldTypeError { field, value } => {
                write!(f, "field '{field}' is not numeric: '{value}'")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Stateful parser for one ingestion session.
pub struct RecordParser {
    kind: RecordKind,
    thresholds: RoomThresholds,
    /// Subcarrier count established by the first amplitude record.
    session_subcarriers: Option<usize>,
}

impl RecordParser {
    pub fn new(kind: RecordKind, thresholds: RoomThresholds) -> Self {
        Self {
            kind,
            thresholds,
            session_subcarriers: None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Parse one raw line into a record of this parser's kind.
    pub fn parse(&mut self, raw: &RawLine) -> Result<Record, ParseError> {
        match self.kind {
            RecordKind::Amplitude => self.parse_amplitude(raw).map(Record::Amplitude),
            RecordKind::Telemetry => self.parse_telemetry(raw).map(Record::Telemetry),
        }
    }

    /// Decode a bracketed `[r0, i0, r1, i1, ...]` sequence into amplitudes.
    fn parse_amplitude(&mut self, raw: &RawLine) -> Result<AmplitudeRecord, ParseError> {
        let values = decode_sequence(&raw.text)?;
        if values.len() % 2 != 0 {
            return Err(ParseError::OddLength { len: values.len() });
        }

        let pair_count = values.len() / 2;
        match self.session_subcarriers {
            Some(expected) if expected != pair_count => {
                return Err(ParseError::LengthMismatch {
                    expected,
                    actual: pair_count,
                });
            }
            Some(_) => {}
            None => self.session_subcarriers = Some(pair_count),
        }

        // Even indices are real parts, odd indices imaginary.
        let amplitudes = values
            .chunks_exact(2)
            .map(|pair| (pair[0] * pair[0] + pair[1] * pair[1]).sqrt())
            .collect();

        Ok(AmplitudeRecord {
            timestamp: raw.timestamp.unwrap_or_else(Utc::now),
            amplitudes,
        })
    }

    /// Decode a comma-delimited `RADAR_DADA` telemetry line.
    fn parse_telemetry(&self, raw: &RawLine) -> Result<TelemetryRecord, ParseError> {
        let line = raw.text.trim();
        if !line.starts_with(TELEMETRY_TAG) {
            return Err(ParseError::UnrecognizedPrefix);
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < TELEMETRY_MIN_FIELDS {
            return Err(ParseError::FieldCountMismatch {
                required: TELEMETRY_MIN_FIELDS,
                actual: fields.len(),
            });
        }

        let sequence = parse_field::<i64>(fields[FIELD_SEQUENCE], "sequence")?;
        let device_timestamp = parse_field::<i64>(fields[FIELD_DEVICE_TIMESTAMP], "timestamp")?;
        let wander = parse_field::<f64>(fields[FIELD_WANDER], "wander")?;
        let jitter = parse_field::<f64>(fields[FIELD_JITTER], "jitter")?;
        // The firmware prints the flag as a float; truncate to an integer flag.
        let motion = parse_field::<f64>(fields[FIELD_MOTION], "motion")? as i64 != 0;

        let room = wander > self.thresholds.wander || jitter > self.thresholds.jitter;

        Ok(TelemetryRecord {
            sequence,
            device_timestamp,
            received_at: Utc::now(),
            wander,
            jitter,
            room,
            motion,
        })
    }
}

/// Decode a bracketed, comma-separated numeric sequence.
fn decode_sequence(text: &str) -> Result<Vec<f64>, ParseError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::MalformedSequence("missing brackets".to_string()))?;

    let inner = inner.trim();
    if inner.is_empty() {
        // A record with no subcarriers carries no signal, and must not
        // establish the session length either.
        return Err(ParseError::MalformedSequence("empty sequence".to_string()));
    }

    inner
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<f64>()
                .map_err(|_| ParseError::MalformedSequence(format!("bad number '{token}'")))
        })
        .collect()
}

fn parse_field<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
) -> Result<T, ParseError> {
    value.trim().parse::<T>().map_err(|_| ParseError::FieldTypeError {
        field,
        value: value.to_string(),
    })
}
