//! Pipeline orchestration for esp-overlay.
//!
//! Wires capture, detection, aim control and hotkeys together, runs the display
//! loop on the calling thread and tears everything down in a fixed order.

use crossbeam_channel::Receiver;
use rdev::Key;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::aim::{self, AimController, AimError, AimSettings, CursorTracker, PointerActuator};
use crate::capture::{self, CaptureError, FrameQueue, FrameSource};
use crate::config::{Config, ConfigError};
use crate::detect::{DetectError, DetectionWorker, Detector, DetectorConfig, ResultQueue};
use crate::engine::{self, EngineError};
use crate::hotkeys::{self, HotkeyBindings, HotkeyError, InputWatcher};
use crate::present::{HeadlessPresenter, Presenter};
use crate::state::SharedState;

/// How long the display loop waits for a result before checking worker health.
const DISPLAY_POLL: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load model: {0}")]
    Engine(#[from] EngineError),

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Aim(#[from] AimError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    CtrlC(#[from] ctrlc::Error),
}

/// Why the display loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `running` was latched false (hotkey, Ctrl+C, another worker)
    ShutdownRequested,
    /// The presenter reported a local exit request
    UserExit,
    CaptureStopped,
    DetectorStopped,
    /// The display loop panicked
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_presented: u64,
    pub reason: StopReason,
}

/// Values read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub frame_queue_size: usize,
    pub result_queue_size: usize,
    pub aim: AimSettings,
    pub hotkeys: HotkeyBindings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            frame_queue_size: 2,
            result_queue_size: 4,
            aim: AimSettings::default(),
            hotkeys: HotkeyBindings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self, HotkeyError> {
        Ok(Self {
            frame_queue_size: config.performance.frame_queue_size,
            result_queue_size: config.performance.result_queue_size(),
            aim: AimSettings::from(&config.aim),
            hotkeys: HotkeyBindings::from_config(&config.hotkeys)?,
        })
    }
}

/// Everything the pipeline drives, built by the caller around
/// [`Pipeline::frame_queue`] and [`Pipeline::state`].
pub struct Components {
    pub source: Box<dyn FrameSource>,
    pub detector: Detector,
    pub pointer: Box<dyn PointerActuator>,
    pub presenter: Box<dyn Presenter>,
    pub keys: Receiver<Key>,
}

pub struct Pipeline {
    settings: PipelineSettings,
    state: SharedState,
    frames: FrameQueue,
    results: ResultQueue,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, state: SharedState) -> Self {
        let frames = FrameQueue::new(settings.frame_queue_size);
        let results = ResultQueue::new(settings.result_queue_size);
        Self {
            settings,
            state,
            frames,
            results,
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn frame_queue(&self) -> FrameQueue {
        self.frames.clone()
    }

    /// Start every worker, run the display loop until shutdown, then clean up.
    ///
    /// A capture source that fails to start aborts before any worker is
    /// launched.
    pub fn run(self, components: Components) -> Result<RunSummary, PipelineError> {
        let Components {
            mut source,
            detector,
            pointer,
            mut presenter,
            keys,
        } = components;

        if let Err(e) = source.start() {
            self.state.request_shutdown();
            return Err(e.into());
        }

        if let Some(props) = source.properties() {
            let (cx, cy) = props.center();
            self.state.set_center(cx, cy);
            log::info!("Screen centre set to ({cx}, {cy})");
        }

        let mut workers = Workers::default();
        if let Err(e) = workers.start(&self, detector, pointer, keys) {
            self.state.request_shutdown();
            source.stop();
            workers.stop();
            return Err(e);
        }

        log::info!("Pipeline running.");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            display_loop(&self, source.as_ref(), &workers, presenter.as_mut())
        }));
        let summary = outcome.unwrap_or_else(|_| {
            log::error!("Display loop panicked, shutting down");
            RunSummary {
                frames_presented: 0,
                reason: StopReason::Fault,
            }
        });

        log::info!("Initiating shutdown sequence ({:?})...", summary.reason);
        self.state.request_shutdown();
        source.stop();
        workers.stop();
        presenter.shutdown();
        log::info!("Cleanup complete. Exiting.");

        Ok(summary)
    }
}

#[derive(Default)]
struct Workers {
    detector: Option<DetectionWorker>,
    aim: Option<AimController>,
    input: Option<InputWatcher>,
}

impl Workers {
    fn start(
        &mut self,
        pipeline: &Pipeline,
        detector: Detector,
        pointer: Box<dyn PointerActuator>,
        keys: Receiver<Key>,
    ) -> Result<(), PipelineError> {
        self.detector = Some(DetectionWorker::spawn(
            detector,
            pipeline.frames.clone(),
            pipeline.results.clone(),
            pipeline.state(),
        )?);
        self.aim = Some(AimController::spawn(
            pipeline.state(),
            pointer,
            pipeline.settings.aim,
        )?);
        self.input = Some(InputWatcher::spawn(
            pipeline.state(),
            pipeline.settings.hotkeys,
            keys,
        )?);
        Ok(())
    }

    fn detector_alive(&self) -> bool {
        self.detector.as_ref().is_some_and(DetectionWorker::is_running)
    }

    /// Stop in order: detector, aim, input.
    fn stop(&mut self) {
        if let Some(mut worker) = self.detector.take() {
            worker.stop();
        }
        if let Some(mut aim) = self.aim.take() {
            aim.stop();
        }
        if let Some(mut input) = self.input.take() {
            input.stop();
        }
    }
}

fn display_loop(
    pipeline: &Pipeline,
    source: &dyn FrameSource,
    workers: &Workers,
    presenter: &mut dyn Presenter,
) -> RunSummary {
    let state = &pipeline.state;
    let mut frames_presented = 0u64;

    let reason = loop {
        if !state.is_running() {
            break StopReason::ShutdownRequested;
        }

        match pipeline.results.pop(DISPLAY_POLL) {
            Some(record) => {
                let esp_enabled = state.esp_enabled();
                let shown = presenter
                    .render(&record.frame, &record.detections, esp_enabled)
                    .and_then(|image| presenter.show(&image));
                match shown {
                    Ok(()) => frames_presented += 1,
                    Err(e) => log::warn!("Skipping frame: {e}"),
                }
            }
            None => {
                if !source.is_running() {
                    log::error!("{} capture thread is no longer running", source.name());
                    break StopReason::CaptureStopped;
                }
                if !workers.detector_alive() {
                    log::error!("AI processing thread is no longer running");
                    break StopReason::DetectorStopped;
                }
            }
        }

        if presenter.poll_exit() {
            log::info!("Exit requested from display.");
            break StopReason::UserExit;
        }
    };

    RunSummary {
        frames_presented,
        reason,
    }
}

/// Global flag for handling Ctrl+C across the application
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Check if Ctrl+C has been received.
pub fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Route Ctrl+C into `state`.
///
/// Only one handler can exist per process; a second call keeps the first.
pub fn install_ctrlc_handler(state: SharedState) -> Result<(), ctrlc::Error> {
    let result = ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        if state.request_shutdown() {
            log::info!("Received Ctrl+C, shutting down...");
        }
    });
    match result {
        Err(ctrlc::Error::MultipleHandlers) => {
            log::warn!("Ctrl+C handler already installed");
            Ok(())
        }
        other => other,
    }
}

/// Build every component from `config` and run until shutdown.
pub fn run(config: &Config) -> Result<RunSummary, PipelineError> {
    log::info!("Starting {}...", config.output.window_title);

    let settings = PipelineSettings::from_config(config)?;
    let state = SharedState::new(config.state.esp_enabled, config.state.aim_enabled);
    let pipeline = Pipeline::new(settings, state);

    let engine = engine::load(&config.ai.model_path, config.ai.use_gpu)?;
    let detector = Detector::new(engine, DetectorConfig::from(&config.ai));

    let source = capture::open_source(&config.capture, pipeline.frame_queue(), pipeline.state())?;

    install_ctrlc_handler(pipeline.state())?;
    let cursor = CursorTracker::new();
    let keys = hotkeys::listen_global(cursor.clone())?;
    let pointer = aim::create_pointer(config.aim.dry_run, cursor);
    let presenter = Box::new(HeadlessPresenter::new(&config.output));

    pipeline.run(Components {
        source,
        detector,
        pointer,
        presenter,
        keys,
    })
}
