//! Background capture thread shared by every device variant.

use crossbeam_channel::Sender;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::errors::CaptureError;
use super::types::SourceProperties;
use super::{FrameDevice, FrameQueue, FrameSource};
use crate::queue::PushOutcome;
use crate::state::SharedState;

/// How long `start()` waits for the device to report its properties.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);
/// Back-off after a failed grab.
const GRAB_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Sleep when the device has no new frame yet and advertises no rate.
const IDLE_DELAY: Duration = Duration::from_millis(5);
/// Consecutive grab failures before the loop gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 50;

/// Runs a [`FrameDevice`] on its own thread and feeds the frame queue.
///
/// The device is opened inside the thread, so it does not need to be `Send`.
/// `start()` blocks until the device reports its properties or fails.
pub struct CaptureThread<D: FrameDevice> {
    settings: D::Settings,
    queue: FrameQueue,
    state: SharedState,
    stop_signal: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
    properties: Option<SourceProperties>,
    _device: PhantomData<fn() -> D>,
}

impl<D: FrameDevice> std::fmt::Debug for CaptureThread<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureThread")
            .field("device", &D::NAME)
            .field("properties", &self.properties)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<D: FrameDevice> CaptureThread<D> {
    pub fn new(settings: D::Settings, queue: FrameQueue, state: SharedState) -> Self {
        Self {
            settings,
            queue,
            state,
            stop_signal: Arc::new(AtomicBool::new(false)),
            capture_thread: None,
            properties: None,
            _device: PhantomData,
        }
    }

    /// Signal the thread and forget it without joining.
    fn abandon(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.capture_thread = None;
    }
}

impl<D: FrameDevice> FrameSource for CaptureThread<D> {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }

        // A previous run may have left a finished handle behind.
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }

        log::info!("Starting {} capture thread...", D::NAME);
        self.stop_signal = Arc::new(AtomicBool::new(false));

        let settings = self.settings.clone();
        let queue = self.queue.clone();
        let state = self.state.clone();
        let stop = Arc::clone(&self.stop_signal);
        let (info_tx, info_rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || run_capture_loop::<D>(settings, queue, state, stop, info_tx))
            .map_err(CaptureError::Spawn)?;
        self.capture_thread = Some(handle);

        match info_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(properties)) => {
                log::info!(
                    "{} capture opened: {}x{} @ {:.2} FPS",
                    D::NAME,
                    properties.width,
                    properties.height,
                    properties.nominal_fps
                );
                self.properties = Some(properties);
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                // The thread may be stuck inside the driver; don't block on it.
                self.abandon();
                Err(CaptureError::OpenTimedOut(OPEN_TIMEOUT))
            }
        }
    }

    fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);

        if let Some(handle) = self.capture_thread.take() {
            log::info!("Stopping {} capture thread...", D::NAME);
            if handle.join().is_err() {
                log::warn!("{} capture thread panicked", D::NAME);
            }
        }
    }

    fn properties(&self) -> Option<SourceProperties> {
        self.properties
    }

    fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn name(&self) -> &'static str {
        D::NAME
    }
}

impl<D: FrameDevice> Drop for CaptureThread<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture_loop<D: FrameDevice>(
    settings: D::Settings,
    queue: FrameQueue,
    state: SharedState,
    stop: Arc<AtomicBool>,
    info_tx: Sender<Result<SourceProperties, CaptureError>>,
) {
    let (mut device, properties) = match D::open(&settings) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    if properties.width == 0 || properties.height == 0 {
        device.close();
        let _ = info_tx.send(Err(CaptureError::ZeroResolution {
            width: properties.width,
            height: properties.height,
        }));
        return;
    }

    let _ = info_tx.send(Ok(properties));
    let frame_interval = properties.frame_interval();
    let mut failures = 0u32;

    while !stop.load(Ordering::Relaxed) && state.is_running() {
        let started = Instant::now();

        match device.grab() {
            Ok(Some(frame)) => {
                failures = 0;
                if queue.push(frame) == PushOutcome::EvictedOldest {
                    log::trace!("Frame queue full, dropped oldest frame.");
                }
            }
            Ok(None) => {
                if frame_interval.is_none() {
                    thread::sleep(IDLE_DELAY);
                }
            }
            Err(e) => {
                failures += 1;
                log::warn!("{e}");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    log::error!(
                        "{} capture failed {failures} times in a row, giving up",
                        D::NAME
                    );
                    break;
                }
                thread::sleep(GRAB_RETRY_DELAY);
                continue;
            }
        }

        if let Some(interval) = frame_interval {
            let elapsed = started.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    }

    device.close();
    log::info!("{} capture resources released.", D::NAME);
}
