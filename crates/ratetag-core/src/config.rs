//! Shared configuration: where artifacts live and which categories to predict.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, read_json};

/// What to do when one category's model or labels cannot be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Leave the failed category's column empty and report the failure.
    #[default]
    BestEffort,
    /// Cancel outstanding categories and fail the whole request.
    FailFast,
}

/// Artifact file layout relative to the models directory.
///
/// `{category}` in a pattern is replaced by the category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    pub vocabulary: PathBuf,
    pub model: String,
    pub labels: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            vocabulary: PathBuf::from("tfidf/tfidf_data.json"),
            model: "cbm/catboost_model_{category}.onnx".to_string(),
            labels: "labels/json/labels_{category}.json".to_string(),
        }
    }
}

const PLACEHOLDER: &str = "{category}";

impl ArtifactLayout {
    pub fn vocabulary_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(&self.vocabulary)
    }

    pub fn model_path(&self, models_dir: &Path, category: &str) -> PathBuf {
        models_dir.join(self.model.replace(PLACEHOLDER, category))
    }

    pub fn labels_path(&self, models_dir: &Path, category: &str) -> PathBuf {
        models_dir.join(self.labels.replace(PLACEHOLDER, category))
    }

    /// Recover the category name from a model file name, if it fits the pattern.
    ///
    /// Only the file-name part of the pattern is matched.
    pub fn category_from_model_file(&self, file_name: &str) -> Option<String> {
        let pattern = Path::new(&self.model).file_name()?.to_str()?;
        let (prefix, suffix) = pattern.split_once(PLACEHOLDER)?;
        let name = file_name.strip_prefix(prefix)?.strip_suffix(suffix)?;
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Directory that holds the model files.
    pub fn model_dir(&self, models_dir: &Path) -> PathBuf {
        match Path::new(&self.model).parent() {
            Some(parent) => models_dir.join(parent),
            None => models_dir.to_path_buf(),
        }
    }
}

/// Tagger configuration, typically loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub models_dir: PathBuf,
    /// CSV column holding the rate names; also the first output header.
    pub input_col: String,
    /// Categories predicted when a request does not name any.
    pub categories: Vec<String>,
    pub error_policy: ErrorPolicy,
    /// Vectorizer pool size; `None` uses every available core.
    pub workers: Option<usize>,
    pub layout: ArtifactLayout,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("artifacts/models"),
            input_col: "rate_name".to_string(),
            categories: Vec::new(),
            error_policy: ErrorPolicy::default(),
            workers: None,
            layout: ArtifactLayout::default(),
        }
    }
}

impl TaggerConfig {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let config: Self = read_json(path)?;
        if config.input_col.is_empty() {
            return Err(ArtifactError::invalid(path, "input_col must not be empty"));
        }
        Ok(config)
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        self.layout.vocabulary_path(&self.models_dir)
    }

    pub fn model_path(&self, category: &str) -> PathBuf {
        self.layout.model_path(&self.models_dir, category)
    }

    pub fn labels_path(&self, category: &str) -> PathBuf {
        self.layout.labels_path(&self.models_dir, category)
    }
}
