#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::{Classification, ClassifierBackend, Label};

/// Tract-based backend running a local ONNX classification model.
///
/// The model is expected to take a `1x3xHxW` f32 tensor and produce one score
/// per class, with class 0 = no incident and class 1 = incident. Any other
/// argmax index maps to [`Label::Unknown`]. No network I/O happens beyond
/// loading the model file.
pub struct TractClassifier {
    model: TypedSimplePlan<TypedModel>,
    width: u32,
    height: u32,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
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
            model,
            width,
            height,
        })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn extract_class(&self, outputs: TVec<TValue>) -> Result<(usize, f32)> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        // Softmax over the raw scores so the confidence is a probability.
        let max_score = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if !max_score.is_finite() {
            return Err(anyhow!("model output contained no finite scores"));
        }
        let exps: Vec<f32> = scores.iter().map(|s| (s - max_score).exp()).collect();
        let total: f32 = exps.iter().sum();
        if total <= 0.0 {
            return Err(anyhow!("softmax normalizer vanished"));
        }

        let (index, exp) = exps
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| anyhow!("model produced an empty score vector"))?;

        Ok((index, exp / total))
    }
}

impl ClassifierBackend for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn classify(&self, pixels: &[u8], width: u32, height: u32) -> Result<Classification> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let (index, confidence) = self.extract_class(outputs)?;

        let label = match index {
            0 => Label::NoIncident,
            1 => Label::Incident,
            _ => Label::Unknown,
        };

        Ok(Classification { label, confidence })
    }

    fn warm_up(&self) -> Result<()> {
        // One inference over a blank frame primes tract's internal buffers so
        // the first real frame does not pay the allocation cost.
        let blank = vec![0u8; (self.width as usize) * (self.height as usize) * 3];
        self.classify(&blank, self.width, self.height)?;
        Ok(())
    }
}
