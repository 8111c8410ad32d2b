//! Embedded inference backend.
//!
//! On constrained targets the model ships inside the firmware image and every
//! buffer is allocated once at startup. `InferenceContext` owns both the model
//! and the staging arena; `run_embedded` borrows it for one cycle.

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// Default staging resolution for embedded models.
pub const EMBEDDED_INPUT_SIZE: u32 = 320;

/// Preallocated planar input buffer, reused every cycle.
#[derive(Debug)]
pub struct InputArena {
    buffer: Vec<f32>,
    width: u32,
    height: u32,
}

impl InputArena {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("input arena must be at least 1x1"));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("input arena dimensions overflow"))?;
        Ok(Self {
            buffer: vec![0.0; len],
            width,
            height,
        })
    }

    /// Resample `frame` into the arena and return the staged values.
    pub fn stage(&mut self, frame: &Frame) -> Result<&[f32]> {
        frame.write_chw(&mut self.buffer, self.width, self.height)?;
        Ok(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(feature = "backend-tract")]
pub use with_model::{run_embedded, EmbeddedBackend, InferenceContext};

#[cfg(feature = "backend-tract")]
mod with_model {
    use anyhow::Result;
    use ndarray::Array2;

    use super::InputArena;
    use crate::detect::backend::{DetectionCapability, InferenceBackend};
    use crate::detect::backends::tract::TractModel;
    use crate::frame::Frame;

    /// Single owned instance of the model plus its input arena.
    pub struct InferenceContext {
        model: TractModel,
        arena: InputArena,
    }

    impl InferenceContext {
        pub fn new(model_bytes: &[u8], width: u32, height: u32) -> Result<Self> {
            if model_bytes.is_empty() {
                anyhow::bail!("embedded model image is empty");
            }
            let arena = InputArena::new(width, height)?;
            let model = TractModel::from_bytes(model_bytes, width, height)?;
            Ok(Self { model, arena })
        }

        pub fn arena(&self) -> &InputArena {
            &self.arena
        }
    }

    /// Stage the frame into the context's arena and invoke the model.
    pub fn run_embedded(ctx: &mut InferenceContext, frame: &Frame) -> Result<Array2<f32>> {
        let InferenceContext { model, arena } = ctx;
        let input = arena.stage(frame)?;
        model.run(input)
    }

    /// Embedded backend: the model image is read once and the context lives
    /// for the whole process.
    pub struct EmbeddedBackend {
        context: InferenceContext,
    }

    impl EmbeddedBackend {
        pub fn new(context: InferenceContext) -> Self {
            let (w, h) = context.arena().dimensions();
            log::info!("EmbeddedBackend: context ready ({}x{} arena)", w, h);
            Self { context }
        }

        pub fn from_model_image(bytes: &[u8], width: u32, height: u32) -> Result<Self> {
            Ok(Self::new(InferenceContext::new(bytes, width, height)?))
        }
    }

    impl InferenceBackend for EmbeddedBackend {
        fn name(&self) -> &'static str {
            "embedded"
        }

        fn supports(&self, capability: DetectionCapability) -> bool {
            matches!(capability, DetectionCapability::ObjectDetection)
        }

        fn infer(&mut self, frame: &Frame) -> Result<Array2<f32>> {
            run_embedded(&mut self.context, frame)
        }

        fn warm_up(&mut self) -> Result<()> {
            let (w, h) = self.context.arena().dimensions();
            run_embedded(&mut self.context, &Frame::blank(w, h)?).map(|_| ())
        }
    }

}
