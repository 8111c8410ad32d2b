//! Intersection-over-union and greedy non-maximum suppression.

use super::result::BoundingBox;

/// Intersection-over-union of two boxes.
///
/// Disjoint boxes give exactly 0; two zero-area boxes give 0 instead of NaN.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter = a.intersection_area(b);
    if inter <= 0.0 {
        return 0.0;
    }
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

/// Greedy suppressor with an independent score floor and overlap threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonMaxSuppressor {
    /// Candidates scoring below this never enter suppression.
    pub score_floor: f32,
    /// Candidates overlapping an accepted box at or above this IoU are dropped.
    pub iou_threshold: f32,
}

impl NonMaxSuppressor {
    pub fn new(score_floor: f32, iou_threshold: f32) -> Self {
        Self {
            score_floor,
            iou_threshold,
        }
    }

    /// Indices of the boxes to keep, in acceptance order (highest score first).
    pub fn suppress(&self, boxes: &[BoundingBox], scores: &[f32]) -> Vec<usize> {
        non_max_suppression(boxes, scores, self.score_floor, self.iou_threshold)
    }
}

/// Greedy NMS over parallel `boxes`/`scores`.
///
/// Each round accepts the highest remaining score (the earliest index wins
/// ties) and removes every remaining candidate whose IoU with it is at least
/// `iou_threshold`. Extra entries in the longer slice are ignored.
pub fn non_max_suppression(
    boxes: &[BoundingBox],
    scores: &[f32],
    score_floor: f32,
    iou_threshold: f32,
) -> Vec<usize> {
    let n = boxes.len().min(scores.len());
    let mut remaining: Vec<usize> = (0..n).filter(|&i| scores[i] >= score_floor).collect();
    let mut keep = Vec::new();

    while !remaining.is_empty() {
        let mut best_pos = 0;
        for (pos, &idx) in remaining.iter().enumerate().skip(1) {
            if scores[idx] > scores[remaining[best_pos]] {
                best_pos = pos;
            }
        }
        let best = remaining.remove(best_pos);
        keep.push(best);
        remaining.retain(|&idx| iou(&boxes[best], &boxes[idx]) < iou_threshold);
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_boxes_have_iou_one() {
        let a = BoundingBox::new(3.0, 4.0, 50.0, 60.0);
        assert_eq!(iou(&a, &a), 1.0);
    }

    #[test]
    fn disjoint_boxes_have_iou_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
        // Overlap on x only.
        let c = BoundingBox::new(5.0, 50.0, 10.0, 10.0);
        assert_eq!(iou(&a, &c), 0.0);
    }

    #[test]
    fn zero_area_boxes_do_not_divide_by_zero() {
        let a = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(iou(&a, &a), 0.0);
    }

    #[test]
    fn half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn keeps_best_and_distant_box() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            // IoU with the first is 0.9 (9000 / 10000 overlap, union 10000).
            BoundingBox::new(0.0, 0.0, 100.0, 90.0),
            BoundingBox::new(300.0, 300.0, 50.0, 50.0),
        ];
        assert!((iou(&boxes[0], &boxes[1]) - 0.9).abs() < 1e-6);
        assert_eq!(iou(&boxes[0], &boxes[2]), 0.0);

        let keep = non_max_suppression(&boxes, &[0.9, 0.8, 0.7], 0.0, 0.5);
        assert_eq!(keep, vec![0, 2]);
    }

    #[test]
    fn equal_scores_prefer_first_in_input_order() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        ];
        assert_eq!(non_max_suppression(&boxes, &[0.5, 0.5], 0.0, 0.5), vec![0]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(5.0, 0.0, 10.0, 10.0),
        ];
        let overlap = iou(&boxes[0], &boxes[1]);
        assert_eq!(non_max_suppression(&boxes, &[0.9, 0.8], 0.0, overlap), vec![0]);
        assert_eq!(
            non_max_suppression(&boxes, &[0.9, 0.8], 0.0, overlap + 1e-3),
            vec![0, 1]
        );
    }

    #[test]
    fn score_floor_is_independent_of_overlap() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(50.0, 50.0, 10.0, 10.0),
        ];
        let nms = NonMaxSuppressor::new(0.6, 0.5);
        assert_eq!(nms.suppress(&boxes, &[0.55, 0.7]), vec![1]);
        assert!(nms.suppress(&[], &[]).is_empty());
    }

    #[test]
    fn results_are_in_descending_score_order() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(100.0, 0.0, 10.0, 10.0),
            BoundingBox::new(200.0, 0.0, 10.0, 10.0),
        ];
        assert_eq!(
            non_max_suppression(&boxes, &[0.2, 0.9, 0.5], 0.0, 0.5),
            vec![1, 2, 0]
        );
    }
}
