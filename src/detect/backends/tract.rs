#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionThresholds};
use crate::detect::yolo::{decode_predictions, letterbox_chw, Letterbox, COCO_LABELS};
use crate::frame::Frame;

/// Tract-based backend for YOLOv8 ONNX object detection.
///
/// Loads a local model file once and runs inference on CPU for every frame.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for square `input_size` inputs.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame, letterbox: &Letterbox) -> Result<Tensor> {
        let size = self.input_size as usize;
        let chw = letterbox_chw(frame, letterbox);
        let input = tract_ndarray::Array4::from_shape_vec((1, 3, size, size), chw)
            .context("letterboxed input does not match model shape")?;
        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(
        &mut self,
        frame: &Frame,
        thresholds: &DetectionThresholds,
    ) -> Result<Vec<Detection>> {
        let letterbox = Letterbox::new(frame.width, frame.height, self.input_size)?;
        let input = self.build_input(frame, &letterbox)?;
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let predictions = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = predictions.shape().to_vec();
        let data: Vec<f32> = predictions.iter().copied().collect();

        decode_predictions(&data, &shape, &letterbox, &COCO_LABELS, thresholds)
    }

    fn warm_up(&mut self) -> Result<()> {
        let frame = Frame::filled(self.input_size, self.input_size, [0, 0, 0], 0)?;
        self.detect(&frame, &DetectionThresholds::default())?;
        Ok(())
    }
}
