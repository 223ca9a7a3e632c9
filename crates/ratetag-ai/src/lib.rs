//! Inference layer: per-category classifiers behind an engine seam, label
//! decoding, and the concurrent multi-category predictor.

mod category;
pub mod decode;
mod engine;
mod error;
mod labels;
mod predictor;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxEngine, OnnxLoader};

pub use category::{CategoryModel, CategoryModelSet};
pub use decode::{Decoded, decode_scores};
pub use engine::{EngineLoader, InferenceEngine, UnavailableLoader};
pub use error::{CategoryError, EngineError, PredictError};
pub use labels::load_labels;
pub use predictor::{PredictionReport, Predictor, ResultTable};

/// The loader to use by default: ONNX Runtime when compiled in.
pub fn default_loader() -> std::sync::Arc<dyn EngineLoader> {
    #[cfg(feature = "onnx")]
    {
        std::sync::Arc::new(OnnxLoader)
    }
    #[cfg(not(feature = "onnx"))]
    {
        std::sync::Arc::new(UnavailableLoader)
    }
}
