use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to load a precomputed artifact (vocabulary, labels, configuration).
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// A vocabulary whose term indices and IDF weights do not line up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VocabularyError {
    #[error("vocabulary is empty")]
    Empty,

    #[error("term {term:?} has index {index}, but only {len} idf values")]
    IndexOutOfRange {
        term: String,
        index: usize,
        len: usize,
    },

    #[error("{distinct} distinct indices for {len} idf values")]
    IndexCount { distinct: usize, len: usize },

    #[error("idf value at index {index} is not finite")]
    NonFiniteIdf { index: usize },
}

impl ArtifactError {
    pub fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Read and deserialize a JSON artifact, mapping every failure to an [`ArtifactError`].
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}
