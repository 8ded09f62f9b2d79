//! Drawing primitives for the overlay.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::PresentError;
use crate::capture::Frame;
use crate::detect::Detection;

pub const CROSSHAIR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const NEAREST_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const SNAP_LINE_COLOR: Rgb<u8> = Rgb([0, 255, 255]);

/// Crosshair arm length either side of the centre.
pub const CROSSHAIR_HALF_SIZE: i32 = 10;

const BOX_THICKNESS: i32 = 2;
const NEAREST_THICKNESS: i32 = 3;

/// Copy a frame into an image buffer.
pub fn frame_image(frame: &Frame) -> Result<RgbImage, PresentError> {
    RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
        PresentError::MalformedFrame {
            width: frame.width,
            height: frame.height,
        },
    )
}

pub fn draw_crosshair(img: &mut RgbImage, center: (i32, i32)) {
    let (cx, cy) = (center.0 as f32, center.1 as f32);
    let half = CROSSHAIR_HALF_SIZE as f32;
    draw_line_segment_mut(img, (cx - half, cy), (cx + half, cy), CROSSHAIR_COLOR);
    draw_line_segment_mut(img, (cx, cy - half), (cx, cy + half), CROSSHAIR_COLOR);
}

/// Draw one detection box plus the snap line from `center` to its centre.
pub fn draw_detection(
    img: &mut RgbImage,
    detection: &Detection,
    center: (i32, i32),
) -> Result<(), PresentError> {
    let (width, height) = img.dimensions();
    let b = detection.bbox;
    if b.x1 < 0 || b.y1 < 0 || b.x2 >= width as i32 || b.y2 >= height as i32 {
        return Err(PresentError::BoxOutOfFrame {
            bbox: b,
            width,
            height,
        });
    }

    let (color, thickness) = if detection.is_nearest {
        (NEAREST_COLOR, NEAREST_THICKNESS)
    } else {
        (BOX_COLOR, BOX_THICKNESS)
    };

    // Thick border drawn as nested rectangles
    for offset in 0..thickness {
        let rect = Rect::at(b.x1 - offset, b.y1 - offset).of_size(
            (b.width() + 1 + offset * 2) as u32,
            (b.height() + 1 + offset * 2) as u32,
        );
        draw_hollow_rect_mut(img, rect, color);
    }

    let (bx, by) = b.center();
    draw_line_segment_mut(
        img,
        (center.0 as f32, center.1 as f32),
        (bx as f32, by as f32),
        SNAP_LINE_COLOR,
    );
    Ok(())
}

/// Crosshair always; boxes and snap lines only with ESP on.
///
/// A detection that cannot be drawn is logged and skipped.
pub fn render_overlay(
    frame: &Frame,
    detections: &[Detection],
    esp_enabled: bool,
) -> Result<RgbImage, PresentError> {
    let mut img = frame_image(frame)?;
    let center = frame.center();

    draw_crosshair(&mut img, center);

    if esp_enabled {
        for detection in detections {
            if let Err(e) = draw_detection(&mut img, detection, center) {
                log::warn!("Error drawing detection: {e}");
            }
        }
    }

    Ok(img)
}
