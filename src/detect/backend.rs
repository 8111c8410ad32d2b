use anyhow::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Capabilities an inference backend may offer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    /// Produces a `[candidates][5 + classes]` box tensor.
    ObjectDetection,
}

/// Which backend implementation to construct at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Scripted tensors; no model required.
    #[default]
    Stub,
    /// Model bytes held in an owned inference context with a reused input arena.
    Embedded,
    /// ONNX model loaded from disk.
    Desktop,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Stub => "stub",
            BackendKind::Embedded => "embedded",
            BackendKind::Desktop => "desktop",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(BackendKind::Stub),
            "embedded" => Ok(BackendKind::Embedded),
            "desktop" => Ok(BackendKind::Desktop),
            other => Err(anyhow::anyhow!(
                "unknown backend '{}'; expected stub, embedded or desktop",
                other
            )),
        }
    }
}

/// Model inference capability.
///
/// Backends turn a frame into the raw detector tensor; decoding and
/// suppression happen outside, so every backend shares the same
/// post-processing.
pub trait InferenceBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run the model on a frame and return its raw output rows.
    ///
    /// Implementations treat the pixel slice as read-only and must not keep
    /// it past the call.
    fn infer(&mut self, frame: &Frame) -> Result<Array2<f32>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
