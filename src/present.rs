//! Overlay rendering and frame display.

mod fps;
mod headless;
mod overlay;

pub use fps::FpsCounter;
pub use headless::HeadlessPresenter;
pub use overlay::{
    draw_crosshair, draw_detection, frame_image, render_overlay, BOX_COLOR, CROSSHAIR_COLOR,
    CROSSHAIR_HALF_SIZE, NEAREST_COLOR, SNAP_LINE_COLOR,
};

use image::RgbImage;
use thiserror::Error;

use crate::capture::Frame;
use crate::detect::{BoundingBox, Detection};

#[derive(Error, Debug)]
pub enum PresentError {
    #[error("Frame buffer does not match {width}x{height}")]
    MalformedFrame { width: u32, height: u32 },

    #[error("Box {bbox:?} lies outside the {width}x{height} frame")]
    BoxOutOfFrame {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("Failed to write snapshot: {0}")]
    Snapshot(#[from] image::ImageError),
}

/// Draws results and shows them to the user. Driven from the display loop.
pub trait Presenter {
    /// Copy `frame` and draw the overlay on it.
    fn render(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        esp_enabled: bool,
    ) -> Result<RgbImage, PresentError>;

    fn show(&mut self, image: &RgbImage) -> Result<(), PresentError>;

    /// True when the user asked to quit from the display side.
    fn poll_exit(&mut self) -> bool;

    fn shutdown(&mut self);
}
