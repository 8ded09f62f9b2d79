//! Error types for capture operations.

/// Errors that can occur while opening or running a frame source.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The requested backend was not compiled into this binary
    #[error("{kind} capture is not available in this build (enable the `{feature}` feature)")]
    BackendUnavailable {
        kind: &'static str,
        feature: &'static str,
    },
    /// Camera enumeration failed
    #[error("failed to list cameras: {0}")]
    QueryFailed(String),
    /// Failed to open the capture device
    #[error("failed to open capture device: {0}")]
    OpenFailed(String),
    /// Device opened but reported an unusable resolution
    #[error("capture device reported zero resolution ({width}x{height}); check the device index or permissions")]
    ZeroResolution { width: u32, height: u32 },
    /// Requested monitor does not exist (monitors are 1-based)
    #[error("monitor {requested} not found; {available} monitor(s) available (1-{available})")]
    MonitorNotFound { requested: usize, available: usize },
    /// Capture region does not fit inside the monitor
    #[error("capture region {region:?} does not fit a {width}x{height} monitor")]
    RegionOutOfBounds {
        region: [u32; 4],
        width: u32,
        height: u32,
    },
    /// Failed to start the device stream
    #[error("failed to start capture stream: {0}")]
    StreamFailed(String),
    /// A single grab failed
    #[error("failed to grab frame: {0}")]
    GrabFailed(String),
    /// The device did not report its properties in time
    #[error("capture device did not report its properties within {0:?}")]
    OpenTimedOut(std::time::Duration),
    /// Capture thread is already running
    #[error("capture thread is already running")]
    AlreadyRunning,
    /// Could not spawn the capture thread
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),
}
