use std::time::Instant;

use crate::capture::Frame;

/// Axis-aligned box in frame pixel coordinates, `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Build a box from two corners in any order.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Integer centre, rounded down.
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x1 + self.x2).div_euclid(2),
            (self.y1 + self.y2).div_euclid(2),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Score in [0, 1]
    pub confidence: f32,
    pub class_id: usize,
    pub is_nearest: bool,
}

/// Output of one detection tick.
///
/// At most one entry of `detections` has `is_nearest` set, and it equals
/// `nearest`.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub timestamp: Instant,
    pub frame: Frame,
    pub detections: Vec<Detection>,
    pub nearest: Option<Detection>,
}
