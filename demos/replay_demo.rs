//! Demonstration of replaying a stored CSI capture through the pipeline.
//!
//! This example shows how to:
//! 1. Create a replay source for a capture CSV
//! 2. Run the ingestion pipeline with a custom renderer
//! 3. Read the derived motion-energy series each tick
//! 4. Inspect ingestion statistics afterwards
//!
//! Run with: cargo run --example replay_demo -- path/to/capture.csv

use std::time::Duration;

use motionsense_agent::{
    config::RoomThresholds,
    core::{FeatureSnapshot, Pipeline, Renderer},
    source::{RecordKind, ReplaySource},
    stats::create_shared_log,
};

/// Renderer that tracks the peak motion energy it has seen.
#[derive(Default)]
struct PeakTracker {
    peak: f64,
    ticks: u64,
}

impl Renderer for PeakTracker {
    fn render(&mut self, _kind: RecordKind, snapshot: &FeatureSnapshot) {
        self.ticks += 1;
        if let FeatureSnapshot::Amplitude(features) = snapshot {
            for &energy in &features.energy {
                if energy > self.peak {
                    self.peak = energy;
                }
            }
            if self.ticks % 10 == 0 {
                println!(
                    "  tick {}: {} records, peak energy {:.3}, threshold {:?}",
                    self.ticks,
                    features.energy.len(),
                    self.peak,
                    features.threshold
                );
            }
        }
    }
}

fn main() {
    println!("Motionsense Agent - Replay Demo");
    println!("================================");
    println!();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: replay_demo <capture.csv>");
        std::process::exit(2);
    });

    let stats = create_shared_log();
    let mut source = ReplaySource::new(&path);
    let mut pipeline = Pipeline::new(
        RecordKind::Amplitude,
        RoomThresholds::default(),
        500,
        Duration::from_millis(50),
        stats.clone(),
    );

    let mut renderer = PeakTracker::default();
    println!("Replaying {path} ...");
    println!();

    match pipeline.run(&mut source, &mut renderer) {
        Ok(state) => println!("Replay finished: {state:?}"),
        Err(e) => {
            eprintln!("Replay failed: {e}");
            std::process::exit(1);
        }
    }

    println!("Peak motion energy: {:.3}", renderer.peak);
    println!();
    println!("{}", stats.summary());
    println!();
    println!("Demo complete!");
}
