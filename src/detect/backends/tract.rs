#![cfg(feature = "backend-tract")]

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionCapability, InferenceBackend};
use crate::frame::Frame;

/// Optimized tract plan plus its fixed `1x3xHxW` input shape.
pub struct TractModel {
    plan: TypedRunnableModel<TypedModel>,
    input_width: u32,
    input_height: u32,
}

impl TractModel {
    /// Load an ONNX model from disk.
    pub fn from_path<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?;
        Self::prepare(model, width, height)
    }

    /// Load an ONNX model already resident in memory.
    pub fn from_bytes(bytes: &[u8], width: u32, height: u32) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut Cursor::new(bytes))
            .context("failed to parse in-memory ONNX model")?;
        Self::prepare(model, width, height)
    }

    fn prepare(model: InferenceModel, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("model input must be at least 1x1"));
        }
        let plan = model
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            plan,
            input_width: width,
            input_height: height,
        })
    }

    /// Passthrough plan returning its `1x3xHxW` input unchanged.
    #[cfg(test)]
    pub(crate) fn passthrough(width: u32, height: u32) -> Result<Self> {
        let mut model = TypedModel::default();
        let input = model.add_source(
            "input",
            f32::fact([1, 3, height as usize, width as usize]),
        )?;
        model.set_output_outlets(&[input])?;
        Ok(Self {
            plan: model.into_runnable()?,
            input_width: width,
            input_height: height,
        })
    }

    pub fn input_width(&self) -> u32 {
        self.input_width
    }

    pub fn input_height(&self) -> u32 {
        self.input_height
    }

    /// Number of floats in one planar input.
    pub fn input_len(&self) -> usize {
        3 * self.input_width as usize * self.input_height as usize
    }

    /// Run the model on a staged `[3][H][W]` input and flatten the first
    /// output to `[rows][cols]`, dropping any leading batch axes.
    pub fn run(&self, input: &[f32]) -> Result<Array2<f32>> {
        let tensor = tract_ndarray::Array4::from_shape_vec(
            (
                1,
                3,
                self.input_height as usize,
                self.input_width as usize,
            ),
            input.to_vec(),
        )
        .context("staged input does not match model shape")?
        .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let cols = view.shape().last().copied().unwrap_or(0);
        if cols == 0 {
            return Ok(Array2::zeros((0, 0)));
        }
        let data: Vec<f32> = view.iter().copied().collect();
        let rows = data.len() / cols;
        Array2::from_shape_vec((rows, cols), data).context("model output is not row-major")
    }
}

/// Desktop backend: ONNX model file on disk, fresh input buffer per frame.
pub struct DesktopBackend {
    model: TractModel,
}

impl DesktopBackend {
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = TractModel::from_path(model_path, width, height)?;
        log::info!(
            "DesktopBackend: loaded {} ({}x{} input)",
            model_path.display(),
            width,
            height
        );
        Ok(Self { model })
    }
}

impl InferenceBackend for DesktopBackend {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::ObjectDetection)
    }

    fn infer(&mut self, frame: &Frame) -> Result<Array2<f32>> {
        let mut input = vec![0.0f32; self.model.input_len()];
        frame.write_chw(
            &mut input,
            self.model.input_width(),
            self.model.input_height(),
        )?;
        self.model.run(&input)
    }

    fn warm_up(&mut self) -> Result<()> {
        let input = vec![0.0f32; self.model.input_len()];
        self.model.run(&input).map(|_| ())
    }
}
