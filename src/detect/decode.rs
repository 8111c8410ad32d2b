//! Raw detector output decoding.
//!
//! The tensor layout is one row per candidate:
//! `[cx, cy, w, h, objectness, class_0 .. class_{C-1}]`, with geometry
//! normalized to `[0, 1]` of the source frame.

use ndarray::{ArrayView1, ArrayView2};

use super::nms::NonMaxSuppressor;
use super::result::{BoundingBox, Detection};

/// Number of leading non-class columns in each row.
pub const ROW_PREFIX: usize = 5;

/// Decoder thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxDecoder {
    /// Gate applied to objectness and to the winning class score.
    pub confidence_threshold: f32,
    /// Minimum combined confidence admitted to suppression.
    pub score_floor: f32,
    /// IoU at or above which a lower-scoring box is suppressed.
    pub nms_threshold: f32,
}

impl BoxDecoder {
    pub fn new(confidence_threshold: f32, nms_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            score_floor: 0.0,
            nms_threshold,
        }
    }

    pub fn with_score_floor(mut self, score_floor: f32) -> Self {
        self.score_floor = score_floor;
        self
    }

    /// Candidates that pass the confidence gates, before suppression.
    ///
    /// A tensor with fewer than `ROW_PREFIX + 1` columns carries no class
    /// scores and decodes to nothing.
    pub fn candidates(
        &self,
        tensor: ArrayView2<'_, f32>,
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<Detection> {
        if tensor.ncols() <= ROW_PREFIX || frame_width == 0 || frame_height == 0 {
            return Vec::new();
        }
        tensor
            .rows()
            .into_iter()
            .filter_map(|row| self.decode_row(row, frame_width as f32, frame_height as f32))
            .collect()
    }

    /// Full pipeline: gate, then suppress overlapping boxes.
    pub fn decode(
        &self,
        tensor: ArrayView2<'_, f32>,
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<Detection> {
        let candidates = self.candidates(tensor, frame_width, frame_height);
        if candidates.is_empty() {
            return candidates;
        }

        let boxes: Vec<BoundingBox> = candidates.iter().map(|d| d.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|d| d.confidence).collect();
        let keep = NonMaxSuppressor::new(self.score_floor, self.nms_threshold)
            .suppress(&boxes, &scores);

        log::debug!(
            "decoded {} rows: {} candidates, {} kept after nms",
            tensor.nrows(),
            candidates.len(),
            keep.len()
        );

        keep.into_iter().map(|idx| candidates[idx].clone()).collect()
    }

    fn decode_row(&self, row: ArrayView1<'_, f32>, fw: f32, fh: f32) -> Option<Detection> {
        let objectness = row[4];
        // Checked before the class scan so weak rows stay cheap.
        if !(objectness >= self.confidence_threshold) {
            return None;
        }

        let mut class_id = 0;
        let mut best = row[ROW_PREFIX];
        for (offset, &score) in row.iter().skip(ROW_PREFIX + 1).enumerate() {
            if score > best {
                best = score;
                class_id = offset + 1;
            }
        }
        if !(best >= self.confidence_threshold) {
            return None;
        }

        Some(Detection {
            bbox: to_frame_box(row[0], row[1], row[2], row[3], fw, fh)?,
            confidence: objectness * best,
            class_id,
        })
    }
}

/// Denormalize a center-form box and clip it to the frame.
///
/// Boxes with nothing left inside `[0, W) x [0, H)` after clipping are
/// dropped.
fn to_frame_box(cx: f32, cy: f32, w: f32, h: f32, fw: f32, fh: f32) -> Option<BoundingBox> {
    let width = w * fw;
    let height = h * fh;
    let left = (cx * fw - width / 2.0).clamp(0.0, fw);
    let top = (cy * fh - height / 2.0).clamp(0.0, fh);
    let width = width.min(fw - left);
    let height = height.min(fh - top);
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    Some(BoundingBox {
        left,
        top,
        width,
        height,
    })
}

/// Decode and suppress in one call, with no separate score floor.
pub fn decode_detections(
    tensor: ArrayView2<'_, f32>,
    confidence_threshold: f32,
    nms_threshold: f32,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Detection> {
    BoxDecoder::new(confidence_threshold, nms_threshold).decode(tensor, frame_width, frame_height)
}
