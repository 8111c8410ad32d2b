pub mod embedded;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use embedded::InputArena;
#[cfg(feature = "backend-tract")]
pub use embedded::{EmbeddedBackend, InferenceContext};
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::{DesktopBackend, TractModel};

use anyhow::Result;

use super::backend::{BackendKind, InferenceBackend};
use crate::config::DetectionSettings;

/// Construct the backend selected by configuration.
pub fn build(settings: &DetectionSettings) -> Result<Box<dyn InferenceBackend>> {
    match settings.backend {
        BackendKind::Stub => Ok(Box::new(StubBackend::new())),
        #[cfg(feature = "backend-tract")]
        BackendKind::Desktop => {
            let path = settings
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("desktop backend requires a model path"))?;
            Ok(Box::new(DesktopBackend::new(
                path,
                settings.input_width,
                settings.input_height,
            )?))
        }
        #[cfg(feature = "backend-tract")]
        BackendKind::Embedded => {
            use anyhow::Context;

            let path = settings
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("embedded backend requires a model image"))?;
            let image = std::fs::read(path)
                .with_context(|| format!("failed to read model image {}", path.display()))?;
            Ok(Box::new(EmbeddedBackend::from_model_image(
                &image,
                settings.input_width,
                settings.input_height,
            )?))
        }
        #[cfg(not(feature = "backend-tract"))]
        other => anyhow::bail!("{} backend requires the backend-tract feature", other.as_str()),
    }
}
