use crate::detect::result::Detection;

/// Greedy per-label non-maximum suppression.
///
/// Candidates are visited by descending confidence. A candidate is dropped when
/// it overlaps an already kept box of the same label by more than `iou_threshold`.
/// The result is ordered by descending confidence.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.label == candidate.label && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn det(label: &str, confidence: f32, x1: f32, x2: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(x1, 0.0, x2, 100.0))
    }

    #[test]
    fn suppresses_overlapping_same_label() {
        let kept = non_max_suppression(
            vec![det("person", 0.6, 0.0, 100.0), det("person", 0.9, 2.0, 102.0)],
            0.7,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn keeps_overlapping_boxes_of_different_labels() {
        let kept = non_max_suppression(
            vec![det("person", 0.6, 0.0, 100.0), det("dog", 0.9, 0.0, 100.0)],
            0.7,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].label, "dog");
    }

    #[test]
    fn keeps_boxes_below_threshold_overlap() {
        // IoU of these two is 1/3.
        let kept = non_max_suppression(
            vec![det("person", 0.8, 0.0, 100.0), det("person", 0.7, 50.0, 150.0)],
            0.7,
        );
        assert_eq!(kept.len(), 2);
    }
}
