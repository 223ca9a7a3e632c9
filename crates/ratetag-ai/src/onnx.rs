//! ONNX Runtime adapter for gradient-boosted classifiers.
//!
//! Models take a single `[rows, width]` float input. The score output is
//! chosen by name and element type, never by position, because exported
//! classifiers usually put an int64 `label` tensor first:
//!
//! - a float tensor whose name mentions `prob` holds class probabilities
//!   (`[rows, classes]`, or `[rows]` for the positive class); these are
//!   mapped back to logits before decoding
//! - otherwise a float tensor whose name mentions `logit` or `raw`, or
//!   failing that the first float tensor, is taken as raw logits
//!
//! Probabilities must be exported as a plain tensor; a ZipMap
//! (sequence of maps) output is rejected at load time.

use std::path::Path;

use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use parking_lot::Mutex;
use ratetag_core::FeatureMatrix;
use tracing::info;

use crate::decode::probabilities_to_logits;
use crate::engine::{EngineLoader, InferenceEngine};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreKind {
    Logits,
    Probabilities,
}

/// One ONNX Runtime session for one category model.
pub struct OnnxEngine {
    // Running a session needs exclusive access.
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    kind: ScoreKind,
}

impl OnnxEngine {
    pub fn load(model_path: &Path) -> Result<Self, EngineError> {
        if !model_path.exists() {
            return Err(EngineError::Load(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let load_err = |e: &dyn std::fmt::Display| {
            EngineError::Load(format!("{}: {e}", model_path.display()))
        };
        let session = Session::builder()
            .map_err(|e| load_err(&e))?
            .commit_from_file(model_path)
            .map_err(|e| load_err(&e))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| load_err(&"model has no inputs"))?;

        let outputs: Vec<(String, OutputDtype)> = session
            .outputs()
            .iter()
            .map(|o| (o.name().to_string(), OutputDtype::of(o.dtype())))
            .collect();
        let (index, kind) = select_score_output(&outputs).map_err(|e| load_err(&e))?;
        let output_name = outputs[index].0.clone();

        info!(
            model = %model_path.display(),
            input = %input_name,
            output = %output_name,
            kind = ?kind,
            "loaded classifier"
        );
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            kind,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputDtype {
    FloatTensor,
    OtherTensor,
    NotTensor,
}

impl OutputDtype {
    fn of(dtype: &ValueType) -> Self {
        match dtype {
            ValueType::Tensor {
                ty: TensorElementType::Float32 | TensorElementType::Float64,
                ..
            } => Self::FloatTensor,
            ValueType::Tensor { .. } => Self::OtherTensor,
            _ => Self::NotTensor,
        }
    }
}

/// Pick the output that carries class scores, and whether it holds logits or probabilities.
fn select_score_output(outputs: &[(String, OutputDtype)]) -> Result<(usize, ScoreKind), String> {
    let float_named = |needles: &[&str]| {
        outputs.iter().position(|(name, dtype)| {
            let name = name.to_ascii_lowercase();
            *dtype == OutputDtype::FloatTensor && needles.iter().any(|n| name.contains(n))
        })
    };

    if let Some(i) = float_named(&["prob"]) {
        return Ok((i, ScoreKind::Probabilities));
    }
    if let Some(i) = float_named(&["logit", "raw"]) {
        return Ok((i, ScoreKind::Logits));
    }
    if let Some(i) = outputs.iter().position(|(name, dtype)| {
        *dtype == OutputDtype::FloatTensor && !name.to_ascii_lowercase().contains("label")
    }) {
        return Ok((i, ScoreKind::Logits));
    }

    if outputs.iter().any(|(name, dtype)| {
        *dtype == OutputDtype::NotTensor && name.to_ascii_lowercase().contains("prob")
    }) {
        return Err("probabilities output is not a tensor; export with ZipMap disabled".into());
    }
    let names: Vec<&str> = outputs.iter().map(|(n, _)| n.as_str()).collect();
    Err(format!("no float score output among [{}]", names.join(", ")))
}

/// Values per row: the last dimension of a rank ≥ 2 tensor, otherwise 1.
fn row_width(shape: &[i64]) -> usize {
    match shape {
        [_, .., last] if *last > 0 => *last as usize,
        _ => 1,
    }
}

impl InferenceEngine for OnnxEngine {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, EngineError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let shape = [features.rows() as i64, features.width() as i64];
        let input = Tensor::from_array((shape, features.as_slice().to_vec().into_boxed_slice()))
            .map_err(|e| EngineError::Predict(format!("build input tensor: {e}")))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| EngineError::Predict(e.to_string()))?;

        let output = &outputs[self.output_name.as_str()];
        let (width, scores) = match output.try_extract_tensor::<f32>() {
            Ok((shape, data)) => (row_width(shape), data.iter().map(|&v| v as f64).collect()),
            Err(_) => {
                let (shape, data) = output.try_extract_tensor::<f64>().map_err(|e| {
                    EngineError::Predict(format!("extract {}: {e}", self.output_name))
                })?;
                (row_width(shape), data.to_vec())
            }
        };

        Ok(match self.kind {
            ScoreKind::Logits => scores,
            ScoreKind::Probabilities => probabilities_to_logits(&scores, width),
        })
    }
}

/// [`EngineLoader`] that opens every model with ONNX Runtime.
pub struct OnnxLoader;

impl EngineLoader for OnnxLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceEngine>, EngineError> {
        Ok(Box::new(OnnxEngine::load(path)?))
    }
}
