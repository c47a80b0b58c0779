//! ONNX Runtime implementation of the inference seam.

use super::{CompiledModel, ExecutionHandle, Tensor4D};
use crate::core::errors::{OcrError, SimpleError};
use ndarray::ArrayD;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A compiled ONNX model.
///
/// The underlying `ort` session is not safe to drive concurrently, so it sits
/// behind a mutex; concurrency across callers is bounded separately by the
/// request pool. The model is an explicitly constructed dependency — there is
/// no process-wide shared engine state.
pub struct OrtModel {
    name: String,
    model_path: PathBuf,
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OrtModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtModel")
            .field("name", &self.name)
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl OrtModel {
    /// Loads an ONNX model from disk, discovering its input and output names
    /// from the session metadata.
    pub fn from_file(model_path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = model_path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        let session = Session::builder()
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| OcrError::inference(&name, "session_load", e))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| {
                OcrError::invalid_input(format!(
                    "model at '{}' declares no inputs",
                    path.display()
                ))
            })?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| {
                OcrError::invalid_input(format!(
                    "model at '{}' declares no outputs",
                    path.display()
                ))
            })?;

        Ok(Self {
            name,
            model_path: path.to_path_buf(),
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
        })
    }

    /// Path the model was loaded from.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl CompiledModel for OrtModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_handle(&self) -> Result<Box<dyn ExecutionHandle>, OcrError> {
        Ok(Box::new(OrtHandle {
            name: self.name.clone(),
            session: Arc::clone(&self.session),
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
        }))
    }
}

/// One execution context against an [`OrtModel`].
pub struct OrtHandle {
    name: String,
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl ExecutionHandle for OrtHandle {
    fn run(&mut self, input: &Tensor4D) -> Result<ArrayD<f32>, OcrError> {
        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| OcrError::inference(&self.name, "tensor_conversion", e))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let mut session = self.session.lock().map_err(|_| {
            OcrError::inference(
                &self.name,
                "session_lock",
                SimpleError::new("session mutex poisoned"),
            )
        })?;

        let outputs = session
            .run(inputs)
            .map_err(|e| OcrError::inference(&self.name, "forward_pass", e))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| OcrError::inference(&self.name, "output_extraction", e))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(OcrError::invalid_input(format!(
                "model '{}' output size mismatch: shape {:?} needs {} values, got {}",
                self.name,
                dims,
                expected,
                data.len()
            )));
        }

        Ok(ArrayD::from_shape_vec(ndarray::IxDyn(&dims), data.to_vec())?)
    }
}
