//! Greedy IoU non-maximum suppression over score-sorted detections.

use crate::detection::Detection;
use crate::geometry::{area, iou_with_areas};

/// Returns indices of the detections that survive suppression.
///
/// `dets` must already be sorted by descending score. A detection is dropped
/// when its IoU with any previously kept detection is strictly greater than
/// `nms_threshold`; the returned indices are increasing.
pub fn nms_sorted_bboxes(dets: &[Detection], nms_threshold: f32) -> Vec<usize> {
    let areas: Vec<f32> = dets.iter().map(|d| area(&d.rect)).collect();
    let mut picked: Vec<usize> = Vec::new();

    'outer: for (i, det) in dets.iter().enumerate() {
        for &kept in picked.iter() {
            let overlap = iou_with_areas(&det.rect, areas[i], &dets[kept].rect, areas[kept]);
            if overlap > nms_threshold {
                continue 'outer;
            }
        }
        picked.push(i);
    }

    picked
}

/// Runs [`nms_sorted_bboxes`] and collects the kept detections.
pub fn nms_sorted(dets: &[Detection], nms_threshold: f32) -> Vec<Detection> {
    nms_sorted_bboxes(dets, nms_threshold)
        .into_iter()
        .map(|idx| dets[idx])
        .collect()
}
