//! ONNX Runtime inference wrapper.
//!
//! [`OrtInfer`] owns a mutex-guarded session for one model and exposes the
//! shape-checked entry points the pipeline needs: a single 4D output (text
//! detection probability maps), a single 3D output (recognition logits),
//! and the detector's paired box/mask-basis outputs. Everything else about
//! the engine (providers, threading, graph optimizations) stays behind the
//! `ort` crate.

use crate::core::errors::{ScanError, ScanResult, SimpleError};
use crate::core::{Tensor3D, Tensor4D};
use ndarray::{ArrayView3, ArrayView4};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

/// Inference engine for a single ONNX model.
pub struct OrtInfer {
    session: Mutex<Session>,
    input_name: String,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("input_name", &self.input_name)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Loads a model from disk and discovers its primary input name.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to the ONNX model file
    /// * `model_name` - Human-readable name used in error messages
    pub fn new(model_path: &Path, model_name: &str) -> ScanResult<Self> {
        let session = Session::builder()?.commit_from_file(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| {
                ScanError::invalid_input(format!(
                    "model '{}' declares no inputs - file may be invalid or corrupted",
                    model_name
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            model_name: model_name.to_string(),
        })
    }

    /// Returns the model name associated with this engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs the session on a 4D input and hands the named outputs to a
    /// processor closure for extraction.
    fn run_with_processor<T>(
        &self,
        x: &Tensor4D,
        processor: impl FnOnce(&str, &ort::session::SessionOutputs, &[String]) -> ScanResult<T>,
    ) -> ScanResult<T> {
        let input_shape = x.shape().to_vec();

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            ScanError::inference(
                &self.model_name,
                format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let mut session_guard = self.session.lock().map_err(|_| {
            ScanError::inference(
                &self.model_name,
                "failed to acquire session lock",
                SimpleError::new("poisoned session mutex"),
            )
        })?;

        let output_names: Vec<String> = session_guard
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        let outputs = session_guard.run(inputs).map_err(|e| {
            ScanError::inference(
                &self.model_name,
                format!("forward pass failed for input shape {input_shape:?}"),
                e,
            )
        })?;

        processor(&self.model_name, &outputs, &output_names)
    }

    /// Runs inference and returns the first output as a 3D tensor
    /// (batch, timesteps, classes). Used for recognition logits.
    pub fn infer_3d(&self, x: &Tensor4D) -> ScanResult<Tensor3D> {
        self.run_with_processor(x, |model_name, outputs, output_names| {
            let name = output_names.first().ok_or_else(|| {
                ScanError::invalid_input(format!("model '{model_name}' declares no outputs"))
            })?;
            extract_3d(model_name, outputs, name)
        })
    }

    /// Runs inference and returns the first output as a 4D tensor
    /// (batch, channels, height, width). Used for probability maps.
    pub fn infer_4d(&self, x: &Tensor4D) -> ScanResult<Tensor4D> {
        self.run_with_processor(x, |model_name, outputs, output_names| {
            let name = output_names.first().ok_or_else(|| {
                ScanError::invalid_input(format!("model '{model_name}' declares no outputs"))
            })?;
            extract_4d(model_name, outputs, name)
        })
    }

    /// Runs inference on a segmentation detector and returns its two
    /// outputs: the box tensor (batch, detections, stride) and the mask
    /// basis tensor (batch, coefficients, height, width).
    pub fn infer_detection(&self, x: &Tensor4D) -> ScanResult<(Tensor3D, Tensor4D)> {
        self.run_with_processor(x, |model_name, outputs, output_names| {
            if output_names.len() < 2 {
                return Err(ScanError::invalid_input(format!(
                    "model '{}' declares {} outputs, detection requires boxes and mask basis",
                    model_name,
                    output_names.len()
                )));
            }
            let boxes = extract_3d(model_name, outputs, &output_names[0])?;
            let mask_basis = extract_4d(model_name, outputs, &output_names[1])?;
            Ok((boxes, mask_basis))
        })
    }
}

/// Extracts a named output as an owned 3D f32 tensor, validating rank and
/// element count.
fn extract_3d(
    model_name: &str,
    outputs: &ort::session::SessionOutputs,
    name: &str,
) -> ScanResult<Tensor3D> {
    let (shape, data) = outputs[name].try_extract_tensor::<f32>().map_err(|e| {
        ScanError::inference(
            model_name,
            format!("failed to extract output tensor '{name}' as f32"),
            e,
        )
    })?;

    if shape.len() != 3 {
        return Err(ScanError::inference(
            model_name,
            format!(
                "expected 3D output for '{}', got {}D with shape {:?}",
                name,
                shape.len(),
                shape
            ),
            SimpleError::new("invalid output tensor rank"),
        ));
    }

    let dims = (shape[0] as usize, shape[1] as usize, shape[2] as usize);
    let view = ArrayView3::from_shape(dims, data).map_err(ScanError::Tensor)?;
    Ok(view.to_owned())
}

/// Extracts a named output as an owned 4D f32 tensor, validating rank and
/// element count.
fn extract_4d(
    model_name: &str,
    outputs: &ort::session::SessionOutputs,
    name: &str,
) -> ScanResult<Tensor4D> {
    let (shape, data) = outputs[name].try_extract_tensor::<f32>().map_err(|e| {
        ScanError::inference(
            model_name,
            format!("failed to extract output tensor '{name}' as f32"),
            e,
        )
    })?;

    if shape.len() != 4 {
        return Err(ScanError::inference(
            model_name,
            format!(
                "expected 4D output for '{}', got {}D with shape {:?}",
                name,
                shape.len(),
                shape
            ),
            SimpleError::new("invalid output tensor rank"),
        ));
    }

    let dims = (
        shape[0] as usize,
        shape[1] as usize,
        shape[2] as usize,
        shape[3] as usize,
    );
    let view = ArrayView4::from_shape(dims, data).map_err(ScanError::Tensor)?;
    Ok(view.to_owned())
}
