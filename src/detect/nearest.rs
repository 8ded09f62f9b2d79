use super::types::Detection;

/// Mark the detection whose box centre is closest to `center`.
///
/// Distances are compared as integer squared distances; on an exact tie the
/// first detection wins. Every other detection has `is_nearest` cleared.
/// Returns a copy of the marked detection.
pub fn select_nearest(detections: &mut [Detection], center: (i32, i32)) -> Option<Detection> {
    let mut nearest: Option<(usize, i64)> = None;

    for (i, det) in detections.iter_mut().enumerate() {
        det.is_nearest = false;
        let (bx, by) = det.bbox.center();
        let dx = (bx - center.0) as i64;
        let dy = (by - center.1) as i64;
        let dist_sq = dx * dx + dy * dy;

        match nearest {
            Some((_, best)) if dist_sq >= best => {}
            _ => nearest = Some((i, dist_sq)),
        }
    }

    let (index, _) = nearest?;
    detections[index].is_nearest = true;
    Some(detections[index].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn at(cx: i32, cy: i32) -> Detection {
        Detection {
            bbox: BoundingBox::new(cx - 5, cy - 5, cx + 5, cy + 5),
            confidence: 0.9,
            class_id: 0,
            is_nearest: false,
        }
    }

    #[test]
    fn test_empty_has_no_nearest() {
        assert_eq!(select_nearest(&mut [], (0, 0)), None);
    }

    #[test]
    fn test_clears_stale_flags() {
        let mut dets = vec![at(100, 0), at(10, 0)];
        dets[0].is_nearest = true;
        select_nearest(&mut dets, (0, 0));
        assert!(!dets[0].is_nearest);
        assert!(dets[1].is_nearest);
    }
}
