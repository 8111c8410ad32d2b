use anyhow::Result;
use ndarray::Array2;

use crate::detect::backend::{DetectionCapability, InferenceBackend};
use crate::detect::decode::ROW_PREFIX;
use crate::frame::Frame;

/// Stub backend for tests and model-less runs.
///
/// Replays a fixed tensor every cycle, or an empty one when none is set.
pub struct StubBackend {
    tensor: Array2<f32>,
    calls: u64,
}

impl StubBackend {
    /// Backend producing no candidates, shaped for the 80 COCO classes.
    pub fn new() -> Self {
        Self::with_tensor(Array2::zeros((0, ROW_PREFIX + 80)))
    }

    pub fn with_tensor(tensor: Array2<f32>) -> Self {
        Self { tensor, calls: 0 }
    }

    /// Number of `infer` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::ObjectDetection)
    }

    fn infer(&mut self, _frame: &Frame) -> Result<Array2<f32>> {
        self.calls += 1;
        Ok(self.tensor.clone())
    }
}
