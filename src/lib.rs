//! Motionsense Agent - windowed ingestion for CSI and radar telemetry.
//!
//! This library ingests short numeric telemetry records, either replayed from
//! a stored CSI capture or streamed live from a serial-attached radar sensor,
//! keeps a bounded recent-history window of parsed records, and derives
//! motion-energy and presence signals from that window for a renderer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Motionsense Agent                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐    ┌──────────┐    ┌──────────┐   ┌─────────┐  │
//! │  │  Source  │───▶│  Parser  │───▶│  Window  │──▶│Features │  │
//! │  │(csv/port)│    │ (typed)  │    │  (FIFO)  │   │(per tick)│ │
//! │  └──────────┘    └──────────┘    └──────────┘   └─────────┘  │
//! │       │                                              │       │
//! │       ▼                                              ▼       │
//! │  ┌──────────┐                                  ┌──────────┐  │
//! │  │  Ingest  │                                  │ Renderer │  │
//! │  │   Log    │                                  │ (caller) │  │
//! │  └──────────┘                                  └──────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The source's producer thread blocks on I/O; the pipeline drains it on the
//! caller's thread and forwards a fresh [`core::FeatureSnapshot`] to the
//! renderer on a fixed tick cadence. One bad line never halts the stream; a
//! broken source does.
//!
//! # Example
//!
//! ```no_run
//! use motionsense_agent::{config::RoomThresholds, core, source, stats};
//! use std::time::Duration;
//!
//! struct Printer;
//! impl core::Renderer for Printer {
//!     fn render(&mut self, _kind: source::RecordKind, snapshot: &core::FeatureSnapshot) {
//!         println!("window holds {} records", snapshot.record_count());
//!     }
//! }
//!
//! let mut replay = source::ReplaySource::new("capture.csv");
//! let mut pipeline = core::Pipeline::new(
//!     source::RecordKind::Amplitude,
//!     RoomThresholds::default(),
//!     500,
//!     Duration::from_millis(200),
//!     stats::create_shared_log(),
//! );
//! pipeline.run(&mut replay, &mut Printer).expect("replay failed");
//! ```

pub mod config;
pub mod core;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, RoomThresholds};
pub use core::{
    compute_snapshot, FeatureSnapshot, ParseError, Pipeline, PipelineState, RecordParser, Renderer,
    SharedWindow, WindowBuffer,
};
pub use source::{
    AmplitudeRecord, LineSource, LiveSource, RawLine, Record, RecordKind, ReplaySource,
    SourceError, SourceEvent, TelemetryRecord,
};
pub use stats::{create_shared_log, IngestLog, IngestStats, SharedIngestLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
