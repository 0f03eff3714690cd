//! Capture → inference → render pipeline.
//!
//! Two worker threads:
//! - capture: pulls frames from the source and pushes them into a
//!   capacity-one `FrameSlot` (a waiting frame is evicted by a newer one)
//! - inference: takes the newest frame, runs the selected model, ticks the
//!   FPS estimate when a backend ran and sends a `FrameResult` to the render
//!   context (an empty result still clears the overlay)
//!
//! The render handoff is fire-and-forget. Nothing flows back from the render
//! context, and a failed send is ignored.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::detect::{Detection, FrameDetector};
use crate::fps::{FpsEstimator, MediaClock};
use crate::frame::FrameSlot;
use crate::ingest::FrameSource;
use crate::model::{ModelOption, ModelSelection};

const SOURCE_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// One inference pass, ready for the render context.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameResult {
    pub sequence: u64,
    pub model: ModelOption,
    pub detections: Vec<Detection>,
    pub fps: f64,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Counters reported when the pipeline stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub frames_inferred: u64,
    pub source_errors: u64,
}

pub struct Pipeline;

impl Pipeline {
    /// Connect `source` and start the capture and inference threads.
    pub fn spawn(
        mut source: Box<dyn FrameSource>,
        detector: FrameDetector,
        selection: ModelSelection,
    ) -> Result<PipelineHandle> {
        source.connect()?;

        let slot = Arc::new(FrameSlot::new());
        let stop = Arc::new(AtomicBool::new(false));
        let inferred = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel();

        let capture = {
            let slot = slot.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("capture".to_string())
                .spawn(move || capture_loop(source, &slot, &stop))?
        };

        let inference = {
            let slot = slot.clone();
            let inferred = inferred.clone();
            thread::Builder::new()
                .name("inference".to_string())
                .spawn(move || inference_loop(&slot, &detector, &selection, tx, &inferred))?
        };

        Ok(PipelineHandle {
            results: rx,
            slot,
            stop,
            inferred,
            capture: Some(capture),
            inference: Some(inference),
        })
    }
}

/// Running pipeline. Dropping it stops the workers.
pub struct PipelineHandle {
    results: Receiver<FrameResult>,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    inferred: Arc<AtomicU64>,
    capture: Option<JoinHandle<CaptureOutcome>>,
    inference: Option<JoinHandle<()>>,
}

struct CaptureOutcome {
    frames_captured: u64,
    source_errors: u64,
}

impl PipelineHandle {
    /// Wait up to `timeout` for the next result. `Ok(None)` on timeout,
    /// an error once the pipeline has finished and the channel is drained.
    pub fn next_result(&self, timeout: Duration) -> Result<Option<FrameResult>> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("pipeline finished")),
        }
    }

    /// Stop both workers and report counters.
    pub fn stop(mut self) -> Result<PipelineStats> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<PipelineStats> {
        self.stop.store(true, Ordering::Release);
        self.slot.close();

        let mut stats = PipelineStats::default();
        if let Some(capture) = self.capture.take() {
            let outcome = capture
                .join()
                .map_err(|_| anyhow!("capture thread panicked"))?;
            stats.frames_captured = outcome.frames_captured;
            stats.source_errors = outcome.source_errors;
        }
        if let Some(inference) = self.inference.take() {
            inference
                .join()
                .map_err(|_| anyhow!("inference thread panicked"))?;
        }
        stats.frames_dropped = self.slot.dropped();
        stats.frames_inferred = self.inferred.load(Ordering::Acquire);
        Ok(stats)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.capture.is_some() || self.inference.is_some() {
            if let Err(err) = self.shutdown() {
                log::error!("pipeline shutdown failed: {}", err);
            }
        }
    }
}

fn capture_loop(
    mut source: Box<dyn FrameSource>,
    slot: &FrameSlot,
    stop: &AtomicBool,
) -> CaptureOutcome {
    let mut source_errors = 0u64;
    while !stop.load(Ordering::Acquire) {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if slot.push(frame) {
                    log::trace!("inference busy; dropped oldest frame");
                }
            }
            Ok(None) => {
                log::info!("source {} ended", source.stats().url);
                break;
            }
            Err(err) => {
                source_errors += 1;
                log::warn!("error capturing frame: {:#}", err);
                if !source.is_healthy() {
                    log::warn!("source {} unhealthy", source.stats().url);
                }
                thread::sleep(SOURCE_ERROR_BACKOFF);
            }
        }
    }
    slot.close();
    CaptureOutcome {
        frames_captured: source.stats().frames_captured,
        source_errors,
    }
}

fn inference_loop(
    slot: &FrameSlot,
    detector: &FrameDetector,
    selection: &ModelSelection,
    tx: Sender<FrameResult>,
    inferred: &AtomicU64,
) {
    let clock = MediaClock::new();
    let mut fps = FpsEstimator::new(clock.now());
    let mut render_gone = false;

    while let Some(frame) = slot.take() {
        let model = selection.current();
        // FPS only moves when a backend actually ran on the frame.
        let (detections, estimate) = match detector.detect(&frame, model) {
            Some(detections) => (detections, fps.tick(clock.now())),
            None => (Vec::new(), fps.fps()),
        };
        inferred.fetch_add(1, Ordering::AcqRel);

        let result = FrameResult {
            sequence: frame.sequence,
            model,
            detections,
            fps: estimate,
            frame_width: frame.width,
            frame_height: frame.height,
        };
        if tx.send(result).is_err() && !render_gone {
            log::debug!("render context gone; results are discarded");
            render_gone = true;
        }
    }
}
