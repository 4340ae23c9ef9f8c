//! Feature derivation over a window snapshot.
//!
//! Pure functions of the snapshot: nothing is cached between ticks, so every
//! value here is re-derivable from the window alone. Amplitude windows yield a
//! motion-energy series and a mean + 2 sigma threshold estimate; telemetry
//! windows are projected out for the renderer without smoothing.

use crate::source::types::{Record, RecordKind};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Derived values for an amplitude (stored capture) window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmplitudeFeatures {
    /// Motion energy per record: population standard deviation across that
    /// record's subcarrier amplitudes.
    pub energy: Vec<f64>,
    /// Trailing mean + 2 sigma over the energy series. `None` until the
    /// window holds at least two records; never NaN.
    pub threshold: Option<f64>,
}

/// Projected series for a telemetry (live radar) window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryFeatures {
    pub wander: Vec<f64>,
    pub jitter: Vec<f64>,
    pub room: Vec<bool>,
    pub motion: Vec<bool>,
}

/// Per-tick output handed to the renderer. Superseded on the next tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeatureSnapshot {
    Amplitude(AmplitudeFeatures),
    Telemetry(TelemetryFeatures),
}

impl FeatureSnapshot {
    /// Number of records the snapshot was derived from.
    pub fn record_count(&self) -> usize {
        match self {
            FeatureSnapshot::Amplitude(f) => f.energy.len(),
            FeatureSnapshot::Telemetry(f) => f.wander.len(),
        }
    }
}

/// Compute the full feature snapshot for the current window contents.
///
/// Records of the wrong kind are ignored; the pipeline only ever fills a
/// window with one kind.
pub fn compute_snapshot(kind: RecordKind, records: &[Record]) -> FeatureSnapshot {
    match kind {
        RecordKind::Amplitude => FeatureSnapshot::Amplitude(compute_amplitude_features(records)),
        RecordKind::Telemetry => FeatureSnapshot::Telemetry(compute_telemetry_features(records)),
    }
}

/// Motion energy of one record: population standard deviation across its
/// subcarrier amplitudes. An empty record has zero energy.
pub fn motion_energy(amplitudes: &[f64]) -> f64 {
    if amplitudes.is_empty() {
        return 0.0;
    }
    amplitudes.iter().population_std_dev()
}

fn compute_amplitude_features(records: &[Record]) -> AmplitudeFeatures {
    let energy: Vec<f64> = records
        .iter()
        .filter_map(|r| match r {
            Record::Amplitude(a) => Some(motion_energy(&a.amplitudes)),
            _ => None,
        })
        .collect();

    // With fewer than two energies there is no spread to estimate; report
    // "undefined" rather than a fabricated number.
    let threshold = if energy.len() < 2 {
        None
    } else {
        let mean = energy.iter().mean();
        let sd = energy.iter().population_std_dev();
        Some(mean + 2.0 * sd)
    };

    AmplitudeFeatures { energy, threshold }
}

fn compute_telemetry_features(records: &[Record]) -> TelemetryFeatures {
    let mut features = TelemetryFeatures::default();
    for record in records {
        if let Record::Telemetry(t) = record {
            features.wander.push(t.wander);
            features.jitter.push(t.jitter);
            features.room.push(t.room);
            features.motion.push(t.motion);
        }
    }
    features
}
