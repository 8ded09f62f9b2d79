//! Frame acquisition.
//!
//! Every capture backend implements [`FrameDevice`] (open, grab, close) and is
//! driven by the shared [`CaptureThread`], which exposes it to the rest of the
//! pipeline as a [`FrameSource`]. The backend is chosen once at startup from
//! [`CaptureKind`]:
//!
//! - `synthetic`: moving test pattern, always available
//! - `webcam` / `elgato`: UVC devices through nokhwa (`webcam` feature)
//! - `screen`: monitor or region capture through scrap (`screen` feature)

mod capture_loop;
mod devices;
mod errors;
#[cfg(feature = "screen")]
mod screen;
mod synthetic;
mod types;
#[cfg(feature = "webcam")]
mod webcam;

pub use capture_loop::CaptureThread;
pub use devices::{format_camera_list, list_cameras, CameraInfo};
pub use errors::CaptureError;
pub use synthetic::{SyntheticDevice, SyntheticSettings};
pub use types::{region_fits, Frame, FrameFormat, SourceProperties};

#[cfg(feature = "screen")]
pub use screen::{ScreenDevice, ScreenSettings};
#[cfg(feature = "webcam")]
pub use webcam::{WebcamDevice, WebcamSettings};

use serde::{Deserialize, Serialize};

use crate::config::CaptureConfig;
use crate::queue::LatestQueue;
use crate::state::SharedState;

/// Queue carrying the newest frames from the source to the detector.
pub type FrameQueue = LatestQueue<Frame>;

/// A capture backend driven by [`CaptureThread`].
pub trait FrameDevice: Sized + 'static {
    /// Everything needed to open the device; moved into the capture thread.
    type Settings: Clone + Send + 'static;

    /// Short name used in logs.
    const NAME: &'static str;

    /// Open the device and report its actual properties.
    fn open(settings: &Self::Settings) -> Result<(Self, SourceProperties), CaptureError>;

    /// Grab the next frame. `Ok(None)` means no new frame is ready yet.
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Release the device.
    fn close(&mut self);
}

/// A running producer of frames, as seen by the orchestration.
pub trait FrameSource: Send {
    /// Open the device and begin pushing frames into the frame queue.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop pushing frames and release the device.
    fn stop(&mut self);

    /// Width, height and nominal fps; `None` before a successful `start()`.
    fn properties(&self) -> Option<SourceProperties>;

    /// True while the capture thread is alive.
    fn is_running(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Capture backend selected in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    /// UVC webcam
    #[default]
    Webcam,
    /// Elgato capture card (a UVC device)
    Elgato,
    /// Monitor or screen region
    Screen,
    /// Generated test pattern
    Synthetic,
}

/// Build the frame source described by `config`.
///
/// The source is not started. Selecting a backend that was not compiled in
/// fails immediately.
pub fn open_source(
    config: &CaptureConfig,
    queue: FrameQueue,
    state: SharedState,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    log::info!("Selected capture type: {:?}", config.kind);

    match config.kind {
        CaptureKind::Synthetic => {
            let [width, height] = config.resolution.unwrap_or([640, 480]);
            let settings = SyntheticSettings {
                width,
                height,
                fps: config.fps.unwrap_or(60),
            };
            Ok(Box::new(CaptureThread::<SyntheticDevice>::new(
                settings, queue, state,
            )))
        }
        CaptureKind::Webcam | CaptureKind::Elgato => open_webcam(config, queue, state),
        CaptureKind::Screen => open_screen(config, queue, state),
    }
}

#[cfg(feature = "webcam")]
fn open_webcam(
    config: &CaptureConfig,
    queue: FrameQueue,
    state: SharedState,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    let settings = WebcamSettings {
        device_index: config.device_index,
        resolution: config.resolution,
        fps: config.fps,
        mirror: config.mirror,
    };
    Ok(Box::new(CaptureThread::<WebcamDevice>::new(
        settings, queue, state,
    )))
}

#[cfg(not(feature = "webcam"))]
fn open_webcam(
    _config: &CaptureConfig,
    _queue: FrameQueue,
    _state: SharedState,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::BackendUnavailable {
        kind: "webcam",
        feature: "webcam",
    })
}

#[cfg(feature = "screen")]
fn open_screen(
    config: &CaptureConfig,
    queue: FrameQueue,
    state: SharedState,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    let settings = ScreenSettings {
        monitor: config.monitor,
        region: config.region,
    };
    Ok(Box::new(CaptureThread::<ScreenDevice>::new(
        settings, queue, state,
    )))
}

#[cfg(not(feature = "screen"))]
fn open_screen(
    _config: &CaptureConfig,
    _queue: FrameQueue,
    _state: SharedState,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::BackendUnavailable {
        kind: "screen",
        feature: "screen",
    })
}
