//! Pipeline orchestration: source -> parser -> window -> features -> renderer.
//!
//! The pipeline owns the concurrency boundary. A source's producer thread
//! blocks on I/O and publishes raw lines to the hand-off channel; `run` drains
//! that channel on the caller's thread, parses, fills the window, and on a
//! fixed tick cadence recomputes features and forwards them to the renderer.
//!
//! States: `Idle -> Running -> {Stopped, Failed}`. Parse failures never leave
//! `Running`; only source faults do. A tick with no new records still
//! recomputes and forwards, so the renderer's view is always current.

use crate::config::RoomThresholds;
use crate::core::features::{compute_snapshot, FeatureSnapshot};
use crate::core::parser::RecordParser;
use crate::core::window::SharedWindow;
use crate::source::types::RecordKind;
use crate::source::{LineSource, SourceError, SourceEvent};
use crate::stats::SharedIngestLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where the pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started yet.
    Idle,
    /// Source opened, draining lines.
    Running,
    /// External stop request, or natural end of a finite replay.
    Stopped,
    /// The source reported a terminal fault.
    Failed,
}

/// Consumer of per-tick feature snapshots. Presentation lives entirely behind
/// this trait; the pipeline only promises one call per tick.
pub trait Renderer {
    fn render(&mut self, kind: RecordKind, snapshot: &FeatureSnapshot);
}

/// Ingestion pipeline for one session.
pub struct Pipeline {
    kind: RecordKind,
    parser: RecordParser,
    window: SharedWindow,
    stats: SharedIngestLog,
    tick_interval: Duration,
    state: PipelineState,
    stop_requested: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        kind: RecordKind,
        thresholds: RoomThresholds,
        window_capacity: usize,
        tick_interval: Duration,
        stats: SharedIngestLog,
    ) -> Self {
        Self {
            kind,
            parser: RecordParser::new(kind, thresholds),
            window: SharedWindow::new(window_capacity),
            stats,
            tick_interval,
            state: PipelineState::Idle,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Handle to the window, shareable with observers.
    pub fn window(&self) -> SharedWindow {
        self.window.clone()
    }

    /// Flag that makes `run` wind down promptly; hand this to a signal handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// Drive the pipeline to completion.
    ///
    /// Returns `Ok(Stopped)` on external stop or natural end-of-sequence, and
    /// the terminal fault (state `Failed`) if the source breaks. Either way
    /// the source's handle is released before returning.
    pub fn run(
        &mut self,
        source: &mut dyn LineSource,
        renderer: &mut dyn Renderer,
    ) -> Result<PipelineState, SourceError> {
        debug_assert_eq!(source.kind(), self.kind);
        self.stop_requested.store(false, Ordering::SeqCst);

        let receiver = match source.start() {
            Ok(receiver) => receiver,
            Err(e) => {
                // Never reached Running.
                self.state = PipelineState::Failed;
                self.stats.record_source_fault();
                return Err(e);
            }
        };
        self.state = PipelineState::Running;

        let mut last_tick = Instant::now();
        // Wake at least this often to honor stop requests and the tick cadence.
        let poll = self.tick_interval.min(Duration::from_millis(100));
        let mut fault: Option<SourceError> = None;

        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                self.state = PipelineState::Stopped;
                break;
            }

            match receiver.recv_timeout(poll) {
                Ok(SourceEvent::Line(line)) => {
                    self.stats.record_line();
                    match self.parser.parse(&line) {
                        Ok(record) => {
                            self.window.push(record);
                            self.stats.record_admitted();
                        }
                        Err(e) => {
                            self.stats.record_parse_failure();
                            eprintln!("Skipping line {}: {e}", line.index);
                        }
                    }
                }
                Ok(SourceEvent::Fault(e)) => {
                    self.stats.record_source_fault();
                    self.state = PipelineState::Failed;
                    fault = Some(e);
                    break;
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    // Producer finished without a fault: natural end.
                    self.state = PipelineState::Stopped;
                    break;
                }
            }

            if last_tick.elapsed() >= self.tick_interval {
                self.tick(renderer);
                last_tick = Instant::now();
            }
        }

        // Release the producer and its handle on every exit path.
        source.stop();

        // One final tick so the renderer sees the complete window.
        self.tick(renderer);

        match fault {
            Some(e) => Err(e),
            None => Ok(self.state),
        }
    }

    fn tick(&mut self, renderer: &mut dyn Renderer) {
        let records = self.window.snapshot();
        let snapshot = compute_snapshot(self.kind, &records);
        renderer.render(self.kind, &snapshot);
        self.stats.record_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::RawLine;
    use crate::stats::create_shared_log;
    use crossbeam_channel::{unbounded, Receiver};

    /// In-memory source for deterministic pipeline tests.
    struct ScriptedSource {
        kind: RecordKind,
        events: Vec<SourceEvent>,
        fail_open: Option<SourceError>,
    }

    impl ScriptedSource {
        fn lines(kind: RecordKind, lines: &[&str]) -> Self {
            Self {
                kind,
                events: lines
                    .iter()
                    .enumerate()
                    .map(|(i, text)| SourceEvent::Line(RawLine::new(i as u64, *text)))
                    .collect(),
                fail_open: None,
            }
        }

        fn failing_open(kind: RecordKind, error: SourceError) -> Self {
            Self {
                kind,
                events: Vec::new(),
                fail_open: Some(error),
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn kind(&self) -> RecordKind {
            self.kind
        }

        fn start(&mut self) -> Result<Receiver<SourceEvent>, SourceError> {
            if let Some(e) = self.fail_open.take() {
                return Err(e);
            }
            let (sender, receiver) = unbounded();
            for event in self.events.drain(..) {
                let _ = sender.send(event);
            }
            Ok(receiver)
        }

        fn stop(&mut self) {}
    }

    /// Renderer that keeps the last snapshot it was handed.
    #[derive(Default)]
    struct CapturingRenderer {
        calls: usize,
        last: Option<FeatureSnapshot>,
    }

    impl Renderer for CapturingRenderer {
        fn render(&mut self, _kind: RecordKind, snapshot: &FeatureSnapshot) {
            self.calls += 1;
            self.last = Some(snapshot.clone());
        }
    }

    fn test_pipeline(kind: RecordKind) -> Pipeline {
        Pipeline::new(
            kind,
            RoomThresholds::default(),
            16,
            Duration::from_millis(10),
            create_shared_log(),
        )
    }

    #[test]
    fn test_bad_lines_skipped_good_lines_kept() {
        let mut pipeline = test_pipeline(RecordKind::Amplitude);
        let stats = pipeline.stats.clone();
        let mut source = ScriptedSource::lines(
            RecordKind::Amplitude,
            &["[3, 4]", "[1, 2]", "[5, 6, 7]", "[0, 0]"],
        );
        let mut renderer = CapturingRenderer::default();

        let state = pipeline.run(&mut source, &mut renderer).expect("run to completion");
        assert_eq!(state, PipelineState::Stopped);
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        let stats = stats.stats();
        assert_eq!(stats.lines_received, 4);
        assert_eq!(stats.records_admitted, 3);
        assert_eq!(stats.parse_failures, 1);

        // Final tick always runs, so the renderer saw the full window.
        assert!(renderer.calls >= 1);
        match renderer.last.expect("final snapshot") {
            FeatureSnapshot::Amplitude(f) => assert_eq!(f.energy.len(), 3),
            other => panic!("wrong snapshot kind: {other:?}"),
        }
    }

    #[test]
    fn test_open_failure_never_reaches_running() {
        let mut pipeline = test_pipeline(RecordKind::Telemetry);
        let mut source = ScriptedSource::failing_open(
            RecordKind::Telemetry,
            SourceError::ConnectionError("no device".to_string()),
        );
        let mut renderer = CapturingRenderer::default();

        let err = pipeline.run(&mut source, &mut renderer).unwrap_err();
        assert!(matches!(err, SourceError::ConnectionError(_)));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[test]
    fn test_mid_stream_fault_fails_pipeline_but_keeps_window() {
        let mut pipeline = test_pipeline(RecordKind::Telemetry);
        let mut source = ScriptedSource {
            kind: RecordKind::Telemetry,
            events: vec![
                SourceEvent::Line(RawLine::new(0, "RADAR_DADA,1,1000,0.01,0,0,0,0.02,0,1,0")),
                SourceEvent::Fault(SourceError::StreamInterrupted("unplugged".to_string())),
            ],
            fail_open: None,
        };
        let mut renderer = CapturingRenderer::default();

        let err = pipeline.run(&mut source, &mut renderer).unwrap_err();
        assert!(matches!(err, SourceError::StreamInterrupted(_)));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(pipeline.window().len(), 1);
    }

    #[test]
    fn test_stop_handle_stops_run() {
        let mut pipeline = test_pipeline(RecordKind::Telemetry);

        // A source whose channel never ends.
        struct OpenEnded;
        impl LineSource for OpenEnded {
            fn kind(&self) -> RecordKind {
                RecordKind::Telemetry
            }
            fn start(&mut self) -> Result<Receiver<SourceEvent>, SourceError> {
                let (sender, receiver) = unbounded();
                std::mem::forget(sender);
                Ok(receiver)
            }
            fn stop(&mut self) {}
        }

        // stop_requested is reset by run; request stop from another thread.
        let stop = pipeline.stop_handle();
        let requester = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stop.store(true, Ordering::SeqCst);
        });

        let mut renderer = CapturingRenderer::default();
        let state = pipeline.run(&mut OpenEnded, &mut renderer).expect("stopped cleanly");
        assert_eq!(state, PipelineState::Stopped);
        requester.join().expect("requester thread");
    }
}
