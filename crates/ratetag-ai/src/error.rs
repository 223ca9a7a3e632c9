use ratetag_core::ArtifactError;
use thiserror::Error;

/// Failure reported by an inference engine or its loader.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("loading model: {0}")]
    Load(String),

    #[error("running model: {0}")]
    Predict(String),
}

/// A failure isolated to one category.
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("category {category:?}: invalid category name")]
    InvalidName { category: String },

    #[error("category {category:?}: labels: {source}")]
    Labels {
        category: String,
        #[source]
        source: ArtifactError,
    },

    #[error("category {category:?}: {source}")]
    ModelLoad {
        category: String,
        #[source]
        source: EngineError,
    },

    #[error("category {category:?}: {source}")]
    Inference {
        category: String,
        #[source]
        source: EngineError,
    },

    /// Too few raw scores for some rows; those rows keep an empty label.
    #[error("category {category:?}: no scores for {} row(s)", .rows.len())]
    Decode { category: String, rows: Vec<usize> },

    #[error("category {category:?}: cancelled")]
    Cancelled { category: String },
}

impl CategoryError {
    pub fn category(&self) -> &str {
        match self {
            Self::InvalidName { category }
            | Self::Labels { category, .. }
            | Self::ModelLoad { category, .. }
            | Self::Inference { category, .. }
            | Self::Decode { category, .. }
            | Self::Cancelled { category } => category,
        }
    }

    /// Whether the whole category column is unusable (as opposed to some rows).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode { .. } | Self::Cancelled { .. })
    }
}

/// A failure of the prediction request as a whole.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("vocabulary: {0}")]
    Vocabulary(#[from] ArtifactError),

    #[error(transparent)]
    Category(CategoryError),

    #[error("no categories requested and none configured")]
    NoCategories,

    #[error("building vectorizer pool: {0}")]
    ThreadPool(String),
}
