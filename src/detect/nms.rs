//! Greedy class-agnostic non-maximum suppression.

use super::types::{BoundingBox, Detection};

/// Intersection over union; 0 when either box is empty.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x_left = a.x1.max(b.x1);
    let y_top = a.y1.max(b.y1);
    let x_right = a.x2.min(b.x2);
    let y_bottom = a.y2.min(b.y2);

    if x_right <= x_left || y_bottom <= y_top {
        return 0.0;
    }

    let intersection = (x_right - x_left) as i64 * (y_bottom - y_top) as i64;
    let union = a.area() + b.area() - intersection;
    if union <= 0 {
        return 0.0;
    }
    (intersection as f64 / union as f64) as f32
}

/// Keep the highest-confidence box of each overlapping cluster.
///
/// Candidates are visited in descending confidence; equal confidences keep
/// their input order, so the earlier one survives. A candidate is dropped
/// when its IoU with any kept box exceeds `iou_threshold`. The result is
/// ordered by descending confidence.
pub fn non_max_suppression(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| detections[b].confidence.total_cmp(&detections[a].confidence));

    let mut kept: Vec<usize> = Vec::with_capacity(detections.len());
    for i in order {
        let suppressed = kept
            .iter()
            .any(|&k| iou(&detections[k].bbox, &detections[i].bbox) > iou_threshold);
        if !suppressed {
            kept.push(i);
        }
    }

    let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
    kept.into_iter().filter_map(|i| slots[i].take()).collect()
}
