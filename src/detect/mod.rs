mod backend;
pub mod backends;
pub mod decode;
pub mod nms;
mod registry;
mod result;

pub use backend::{BackendKind, DetectionCapability, InferenceBackend};
pub use backends::{InputArena, StubBackend};
pub use decode::{decode_detections, BoxDecoder};
pub use nms::{iou, non_max_suppression, NonMaxSuppressor};
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection};

#[cfg(feature = "backend-tract")]
pub use backends::{DesktopBackend, EmbeddedBackend, InferenceContext};
