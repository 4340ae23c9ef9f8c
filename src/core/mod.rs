//! Core ingestion pipeline.
//!
//! This module contains:
//! - Line parsing into typed records
//! - The bounded FIFO history window
//! - Feature derivation over window snapshots
//! - The pipeline state machine tying them together

pub mod features;
pub mod parser;
pub mod pipeline;
pub mod window;

// Re-export commonly used types
pub use features::{
    compute_snapshot, motion_energy, AmplitudeFeatures, FeatureSnapshot, TelemetryFeatures,
};
pub use parser::{ParseError, RecordParser, TELEMETRY_TAG};
pub use pipeline::{Pipeline, PipelineState, Renderer};
pub use window::{SharedWindow, WindowBuffer};
