//! Detection thread between the frame queue and the result queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::detector::Detector;
use super::{DetectError, ResultQueue};
use crate::capture::FrameQueue;
use crate::queue::PushOutcome;
use crate::state::SharedState;

/// How long the worker blocks on the frame queue before re-checking its flags.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct DetectionWorker {
    stop_signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    /// Move `detector` onto a new `detector` thread.
    pub fn spawn(
        detector: Detector,
        frames: FrameQueue,
        results: ResultQueue,
        state: SharedState,
    ) -> Result<Self, DetectError> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);

        let handle = thread::Builder::new()
            .name("detector".to_string())
            .spawn(move || run_detection_loop(detector, frames, results, state, stop))
            .map_err(DetectError::Spawn)?;

        Ok(Self {
            stop_signal,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            log::info!("Stopping AI processing thread...");
            if handle.join().is_err() {
                log::warn!("AI processing thread panicked");
            }
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_detection_loop(
    mut detector: Detector,
    frames: FrameQueue,
    results: ResultQueue,
    state: SharedState,
    stop: Arc<AtomicBool>,
) {
    log::info!("AI processing thread started.");

    while !stop.load(Ordering::Relaxed) && state.is_running() {
        let Some(frame) = frames.pop(POLL_INTERVAL) else {
            continue;
        };

        let center = frame.center();
        match detector.process(frame) {
            Ok(record) => {
                state.publish_target(record.nearest.clone(), center);
                if results.push(record) == PushOutcome::EvictedOldest {
                    log::warn!("Result queue full, discarded oldest result.");
                }
            }
            Err(e) => log::error!("Error processing frame: {e}"),
        }
    }

    log::info!("AI processing thread finished.");
}
