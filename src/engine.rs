//! Inference engine interface.
//!
//! The detector only sees [`InferenceEngine`]: a loaded model that maps a
//! `[1, 3, H, W]` input tensor to a `[num_candidates, 5 + num_classes]`
//! prediction matrix. The ONNX Runtime backend lives behind the `onnx` feature.

#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEngine;

use half::f16;
use ndarray::{Array2, Array4, ArrayD, ArrayViewD, Axis, Ix2};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fallback for dynamic input dimensions.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Inference backend not compiled in (enable the '{feature}' feature)")]
    BackendUnavailable { feature: &'static str },

    #[error("Model loading failed: {0}")]
    LoadFailed(String),

    #[error("Unsupported model input shape: {0:?}")]
    UnsupportedInput(Vec<i64>),

    #[error("Unsupported tensor element type: {0}")]
    UnsupportedElementType(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected output shape: {0:?}")]
    MalformedOutput(Vec<usize>),
}

/// Channel order the model expects in its input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// Element type of a model tensor. Preprocessing always produces `f32`;
/// half-precision models get a converted copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    F32,
    F16,
}

/// Fixed after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelMetadata {
    pub input_width: u32,
    pub input_height: u32,
    pub channel_order: ChannelOrder,
    pub input_precision: Precision,
    pub output_precision: Precision,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
            channel_order: ChannelOrder::Rgb,
            input_precision: Precision::F32,
            output_precision: Precision::F32,
        }
    }
}

/// A loaded detection model.
pub trait InferenceEngine: Send {
    fn metadata(&self) -> &ModelMetadata;

    /// Run the model on one `[1, 3, H, W]` tensor.
    fn run(&mut self, input: &Array4<f32>) -> Result<Array2<f32>, EngineError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Load the model at `model_path`.
///
/// `use_accelerator` is a preference: when the accelerated backend cannot be
/// set up the engine falls back to CPU with a warning.
pub fn load(
    model_path: &Path,
    use_accelerator: bool,
) -> Result<Box<dyn InferenceEngine>, EngineError> {
    if !model_path.is_file() {
        return Err(EngineError::ModelNotFound(model_path.to_path_buf()));
    }
    load_backend(model_path, use_accelerator)
}

#[cfg(feature = "onnx")]
fn load_backend(
    model_path: &Path,
    use_accelerator: bool,
) -> Result<Box<dyn InferenceEngine>, EngineError> {
    Ok(Box::new(OnnxEngine::load(model_path, use_accelerator)?))
}

#[cfg(not(feature = "onnx"))]
fn load_backend(
    _model_path: &Path,
    _use_accelerator: bool,
) -> Result<Box<dyn InferenceEngine>, EngineError> {
    Err(EngineError::BackendUnavailable { feature: "onnx" })
}

/// Narrow a preprocessed tensor for a half-precision model.
pub fn to_half(input: &Array4<f32>) -> Array4<f16> {
    input.mapv(f16::from_f32)
}

/// Widen a half-precision model output.
pub fn from_half(output: ArrayViewD<'_, f16>) -> ArrayD<f32> {
    output.mapv(f16::to_f32)
}

/// Reduce a raw model output to a `[num_candidates, columns]` matrix.
///
/// Accepts `[N, K]` directly and `[1, N, K]` with the batch axis removed.
pub fn squeeze_predictions(output: ArrayD<f32>) -> Result<Array2<f32>, EngineError> {
    let shape = output.shape().to_vec();
    let output = match shape.as_slice() {
        [_, _] => output,
        [1, _, _] => output.index_axis_move(Axis(0), 0),
        _ => return Err(EngineError::MalformedOutput(shape)),
    };
    output
        .into_dimensionality::<Ix2>()
        .map_err(|_| EngineError::MalformedOutput(shape))
}
