//! The seam between the tagger and the gradient-boosted model runtime.
//!
//! The runtime is opaque: it takes a row-major feature matrix and returns a
//! flat sequence of raw scores (one logit per row for binary models, one
//! logit per row per class for multiclass models).

use std::path::Path;

use ratetag_core::FeatureMatrix;

use crate::error::EngineError;

/// A loaded classifier for one category.
pub trait InferenceEngine: Send + Sync {
    /// Raw scores for every row of `features`, flattened row-major.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>, EngineError>;
}

/// Opens classifier artifacts.
pub trait EngineLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceEngine>, EngineError>;
}

impl<F> EngineLoader for F
where
    F: Fn(&Path) -> Result<Box<dyn InferenceEngine>, EngineError> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceEngine>, EngineError> {
        self(path)
    }
}

/// Loader used when no runtime is compiled in; every load fails.
pub struct UnavailableLoader;

impl EngineLoader for UnavailableLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceEngine>, EngineError> {
        Err(EngineError::Load(format!(
            "{}: built without an inference runtime (enable the `onnx` feature)",
            path.display()
        )))
    }
}
