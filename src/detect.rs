//! Detection stage: letterbox, inference, decode, NMS and nearest-target pick.
//!
//! [`Detector::process`] is the pure per-frame transform; [`DetectionWorker`]
//! runs it on its own thread between the frame queue and the result queue.

mod decode;
mod detector;
mod letterbox;
mod nearest;
mod nms;
mod types;
mod worker;

pub use decode::decode_predictions;
pub use detector::{Detector, DetectorConfig};
pub use letterbox::{Letterbox, PAD_VALUE};
pub use nearest::select_nearest;
pub use nms::{iou, non_max_suppression};
pub use types::{BoundingBox, Detection, ResultRecord};
pub use worker::DetectionWorker;

use thiserror::Error;

use crate::engine::EngineError;
use crate::queue::LatestQueue;

/// Queue carrying result records from the detector to the display loop.
pub type ResultQueue = LatestQueue<ResultRecord>;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Malformed frame: {width}x{height} with {len} bytes")]
    MalformedFrame { width: u32, height: u32, len: usize },

    #[error("Model output has {columns} columns, expected at least 5")]
    MalformedOutput { columns: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to spawn detector thread: {0}")]
    Spawn(#[source] std::io::Error),
}
