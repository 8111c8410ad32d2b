use serde::Serialize;

/// Axis-aligned box in source-frame pixels, corner form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap area, exactly 0 when the boxes do not overlap on either axis.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let l = self.left.max(other.left);
        let r = self.right().min(other.right());
        let t = self.top.max(other.top);
        let b = self.bottom().min(other.bottom());
        if l >= r || t >= b {
            return 0.0;
        }
        (r - l) * (b - t)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        super::nms::iou(self, other)
    }
}

/// One labeled box produced by a decode cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Objectness times the winning class score.
    pub confidence: f32,
    pub class_id: usize,
}
