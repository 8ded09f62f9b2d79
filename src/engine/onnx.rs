//! ONNX Runtime backend.

use half::f16;
use ndarray::{Array2, Array4, ArrayD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{DynValue, TensorRef, ValueType};
use std::path::Path;

use super::{
    from_half, squeeze_predictions, to_half, ChannelOrder, EngineError, InferenceEngine,
    ModelMetadata, Precision, DEFAULT_INPUT_SIZE,
};

pub struct OnnxEngine {
    session: Session,
    metadata: ModelMetadata,
}

impl OnnxEngine {
    pub fn load(model_path: &Path, use_accelerator: bool) -> Result<Self, EngineError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        let session = if use_accelerator {
            match create_cuda_session(model_path) {
                Ok(session) => {
                    log::info!("Using CUDA execution provider");
                    session
                }
                Err(e) => {
                    log::warn!("CUDA execution provider unavailable ({e}), falling back to CPU");
                    create_cpu_session(model_path)?
                }
            }
        } else {
            create_cpu_session(model_path)?
        };

        let metadata = read_metadata(&session)?;
        log::info!(
            "ONNX model loaded successfully. Input size: {}x{} ({:?})",
            metadata.input_width,
            metadata.input_height,
            metadata.input_precision
        );

        Ok(Self { session, metadata })
    }
}

fn create_cpu_session(model_path: &Path) -> Result<Session, EngineError> {
    Session::builder()
        .map_err(|e| EngineError::LoadFailed(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| EngineError::LoadFailed(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| EngineError::LoadFailed(format!("Failed to load model: {}", e)))
}

fn create_cuda_session(model_path: &Path) -> Result<Session, EngineError> {
    use ort::execution_providers::CUDAExecutionProvider;

    Session::builder()
        .map_err(|e| EngineError::LoadFailed(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| EngineError::LoadFailed(e.to_string()))?
        .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
        .map_err(|e| EngineError::LoadFailed(format!("CUDA provider failed: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| EngineError::LoadFailed(format!("Failed to load model with CUDA: {}", e)))
}

fn precision(ty: TensorElementType) -> Result<Precision, EngineError> {
    match ty {
        TensorElementType::Float32 => Ok(Precision::F32),
        TensorElementType::Float16 => Ok(Precision::F16),
        other => Err(EngineError::UnsupportedElementType(format!("{:?}", other))),
    }
}

/// Read `[1, 3, H, W]` and the element type from the first input; dynamic
/// dimensions become 640.
fn read_metadata(session: &Session) -> Result<ModelMetadata, EngineError> {
    let input = session
        .inputs
        .first()
        .ok_or_else(|| EngineError::LoadFailed("model has no inputs".to_string()))?;

    let (dims, input_precision): (Vec<i64>, _) = match &input.input_type {
        ValueType::Tensor { ty, shape, .. } => {
            (shape.iter().copied().collect(), precision(*ty)?)
        }
        other => {
            return Err(EngineError::LoadFailed(format!(
                "model input '{}' is not a tensor: {:?}",
                input.name, other
            )))
        }
    };

    if dims.len() != 4 {
        return Err(EngineError::UnsupportedInput(dims));
    }

    let output_precision = match session.outputs.first().map(|o| &o.output_type) {
        Some(ValueType::Tensor { ty, .. }) => precision(*ty)?,
        _ => return Err(EngineError::LoadFailed("model has no tensor output".to_string())),
    };

    let side = |d: i64| if d > 0 { d as u32 } else { DEFAULT_INPUT_SIZE };
    Ok(ModelMetadata {
        input_height: side(dims[2]),
        input_width: side(dims[3]),
        channel_order: ChannelOrder::Rgb,
        input_precision,
        output_precision,
    })
}

fn extract_output(output: &DynValue, precision: Precision) -> Result<ArrayD<f32>, EngineError> {
    let inference = |e: ort::Error| EngineError::Inference(e.to_string());
    let raw = match precision {
        Precision::F32 => output.try_extract_array::<f32>().map_err(inference)?.into_owned(),
        Precision::F16 => from_half(output.try_extract_array::<f16>().map_err(inference)?),
    };
    Ok(raw)
}

impl InferenceEngine for OnnxEngine {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<Array2<f32>, EngineError> {
        let inference = |e: ort::Error| EngineError::Inference(e.to_string());
        let output_precision = self.metadata.output_precision;

        let raw = match self.metadata.input_precision {
            Precision::F32 => {
                let tensor = TensorRef::from_array_view(input).map_err(inference)?;
                let outputs = self.session.run(ort::inputs![tensor]).map_err(inference)?;
                extract_output(&outputs[0], output_precision)?
            }
            Precision::F16 => {
                let half = to_half(input);
                let tensor = TensorRef::from_array_view(&half).map_err(inference)?;
                let outputs = self.session.run(ort::inputs![tensor]).map_err(inference)?;
                extract_output(&outputs[0], output_precision)?
            }
        };

        squeeze_predictions(raw)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
