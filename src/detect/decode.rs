//! Raw prediction rows to frame-space detections.

use ndarray::{ArrayView1, ArrayView2};

use super::detector::DetectorConfig;
use super::letterbox::Letterbox;
use super::types::{BoundingBox, Detection};
use super::DetectError;

/// Decode `[num_candidates, 5 + num_classes]` predictions.
///
/// Each row is `cx, cy, w, h, objectness, class scores...` in model-input
/// pixels. A row survives when its objectness exceeds the confidence
/// threshold and, with a class allow-list, its arg-max class is allowed. The
/// score is the objectness without an allow-list and the arg-max class score
/// with one; in both cases it must also exceed the threshold. Boxes are
/// mapped back through `letterbox`, clamped into the frame and truncated to
/// whole pixels. Output keeps input row order.
pub fn decode_predictions(
    predictions: ArrayView2<f32>,
    letterbox: &Letterbox,
    frame_size: (u32, u32),
    config: &DetectorConfig,
) -> Result<Vec<Detection>, DetectError> {
    let columns = predictions.ncols();
    if columns < 5 {
        return Err(DetectError::MalformedOutput { columns });
    }

    let max_x = frame_size.0.saturating_sub(1) as f64;
    let max_y = frame_size.1.saturating_sub(1) as f64;
    let threshold = config.conf_threshold;
    let mut detections = Vec::new();

    for row in predictions.rows() {
        if row.iter().any(|v| !v.is_finite()) {
            continue;
        }

        let objectness = row[4];
        if objectness <= threshold {
            continue;
        }

        let (class_id, class_score) = best_class(&row).unwrap_or((0, objectness));
        let confidence = if config.classes.is_empty() {
            objectness
        } else if config.classes.contains(&class_id) {
            class_score
        } else {
            continue;
        };
        if confidence <= threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
        let (ax, ay) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (bx, by) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);

        let clamp_x = |v: f64| v.clamp(0.0, max_x) as i32;
        let clamp_y = |v: f64| v.clamp(0.0, max_y) as i32;

        detections.push(Detection {
            bbox: BoundingBox::new(clamp_x(ax), clamp_y(ay), clamp_x(bx), clamp_y(by)),
            confidence,
            class_id,
            is_nearest: false,
        });
    }

    Ok(detections)
}

/// Arg-max over the class columns; the first maximum wins.
fn best_class(row: &ArrayView1<f32>) -> Option<(usize, f32)> {
    row.iter()
        .skip(5)
        .copied()
        .enumerate()
        .fold(None, |best, (i, score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((i, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    fn config(conf: f32, classes: Vec<usize>) -> DetectorConfig {
        DetectorConfig {
            conf_threshold: conf,
            nms_threshold: 0.5,
            classes,
        }
    }

    fn identity() -> Letterbox {
        Letterbox::fit(640, 640, 640, 640)
    }

    #[test]
    fn test_rejects_narrow_output() {
        let preds = Array2::<f32>::zeros((3, 4));
        let result = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![]));
        assert!(matches!(result, Err(DetectError::MalformedOutput { columns: 4 })));
    }

    #[test]
    fn test_objectness_threshold_is_strict() {
        let preds = arr2(&[
            [100.0, 100.0, 20.0, 20.0, 0.4, 0.9],
            [100.0, 100.0, 20.0, 20.0, 0.41, 0.9],
        ]);
        let dets = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![]))
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.41);
    }

    #[test]
    fn test_allow_list_rescoring() {
        let preds = arr2(&[
            // class 1 wins, allowed
            [100.0, 100.0, 20.0, 20.0, 0.9, 0.1, 0.7],
            // class 0 wins, not allowed
            [200.0, 200.0, 20.0, 20.0, 0.9, 0.8, 0.2],
            // class 1 wins but its score is under the threshold
            [300.0, 300.0, 20.0, 20.0, 0.9, 0.1, 0.3],
        ]);
        let dets =
            decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![1]))
                .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].confidence, 0.7);
    }

    #[test]
    fn test_no_allow_list_uses_objectness_and_argmax() {
        let preds = arr2(&[[100.0, 100.0, 20.0, 20.0, 0.6, 0.1, 0.3, 0.3]]);
        let dets = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![]))
            .unwrap();
        assert_eq!(dets[0].confidence, 0.6);
        // ties resolve to the first class
        assert_eq!(dets[0].class_id, 1);
    }

    #[test]
    fn test_detection_only_model() {
        let preds = arr2(&[[50.0, 50.0, 10.0, 10.0, 0.8]]);
        let dets = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![0]))
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[0].confidence, 0.8);
        assert_eq!(dets[0].bbox, BoundingBox::new(45, 45, 55, 55));
    }

    #[test]
    fn test_non_finite_rows_skipped() {
        let preds = arr2(&[
            [f32::NAN, 100.0, 20.0, 20.0, 0.9, 0.9],
            [100.0, 100.0, f32::INFINITY, 20.0, 0.9, 0.9],
            [100.0, 100.0, 20.0, 20.0, 0.9, 0.9],
        ]);
        let dets = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![]))
            .unwrap();
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn test_boxes_clamped_into_frame() {
        let preds = arr2(&[[5.0, 635.0, 40.0, 40.0, 0.9, 0.9]]);
        let dets = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![]))
            .unwrap();
        let b = dets[0].bbox;
        assert_eq!((b.x1, b.y2), (0, 639));
        assert!(b.x1 <= b.x2 && b.y1 <= b.y2);
    }

    #[test]
    fn test_negative_size_normalized() {
        let preds = arr2(&[[100.0, 100.0, -20.0, -10.0, 0.9, 0.9]]);
        let dets = decode_predictions(preds.view(), &identity(), (640, 640), &config(0.4, vec![]))
            .unwrap();
        assert_eq!(dets[0].bbox, BoundingBox::new(90, 95, 110, 105));
    }
}
