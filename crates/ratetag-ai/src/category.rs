//! Per-category classifiers and the set that owns them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use ratetag_core::{ArtifactError, ArtifactLayout, FeatureMatrix};
use tracing::{debug, info};

use crate::decode::{Decoded, decode_scores};
use crate::engine::{EngineLoader, InferenceEngine};
use crate::error::CategoryError;
use crate::labels::load_labels;

/// One trained classifier plus its ordered class names.
pub struct CategoryModel {
    name: String,
    labels: Vec<String>,
    engine: Box<dyn InferenceEngine>,
}

impl std::fmt::Debug for CategoryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryModel")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl CategoryModel {
    /// Load a category's labels and classifier.
    pub fn load(
        name: &str,
        model_path: &Path,
        labels_path: &Path,
        loader: &dyn EngineLoader,
    ) -> Result<Self, CategoryError> {
        let labels = load_labels(labels_path).map_err(|source| CategoryError::Labels {
            category: name.to_string(),
            source,
        })?;
        let engine = loader
            .load(model_path)
            .map_err(|source| CategoryError::ModelLoad {
                category: name.to_string(),
                source,
            })?;
        info!(
            category = name,
            classes = labels.len(),
            model = %model_path.display(),
            "loaded category model"
        );
        Ok(Self::new(name, labels, engine))
    }

    /// Assemble a model from parts. `labels` must hold at least two classes.
    pub fn new(name: &str, labels: Vec<String>, engine: Box<dyn InferenceEngine>) -> Self {
        debug_assert!(labels.len() >= crate::labels::MIN_CLASSES);
        Self {
            name: name.to_string(),
            labels,
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run the engine once over the whole matrix and decode one label per row.
    pub fn infer(&self, features: &FeatureMatrix) -> Result<Decoded, CategoryError> {
        if features.is_empty() {
            return Ok(decode_scores(&[], &self.labels, 0));
        }
        let scores = self
            .engine
            .predict(features)
            .map_err(|source| CategoryError::Inference {
                category: self.name.clone(),
                source,
            })?;
        debug!(
            category = %self.name,
            rows = features.rows(),
            scores = scores.len(),
            "scored batch"
        );
        Ok(decode_scores(&scores, &self.labels, features.rows()))
    }
}

/// Owned cache of category models, loaded lazily on first use.
///
/// Each set is independent; two pipelines in one process never share models.
pub struct CategoryModelSet {
    models_dir: PathBuf,
    layout: ArtifactLayout,
    loader: Arc<dyn EngineLoader>,
    loaded: RwLock<HashMap<String, Arc<CategoryModel>>>,
}

impl CategoryModelSet {
    pub fn new(models_dir: PathBuf, layout: ArtifactLayout, loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            models_dir,
            layout,
            loader,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached model for `category`, loading it if needed.
    pub fn get_or_load(&self, category: &str) -> Result<Arc<CategoryModel>, CategoryError> {
        if let Some(model) = self.loaded.read().get(category) {
            return Ok(Arc::clone(model));
        }
        if !is_valid_name(category) {
            return Err(CategoryError::InvalidName {
                category: category.to_string(),
            });
        }

        // Load outside the lock; a concurrent loader of the same category may win.
        let model = Arc::new(CategoryModel::load(
            category,
            &self.layout.model_path(&self.models_dir, category),
            &self.layout.labels_path(&self.models_dir, category),
            self.loader.as_ref(),
        )?);
        let mut loaded = self.loaded.write();
        Ok(Arc::clone(
            loaded.entry(category.to_string()).or_insert(model),
        ))
    }

    /// Eagerly load every listed category, collecting failures.
    pub fn load_all(&self, categories: &[String]) -> Vec<CategoryError> {
        categories
            .iter()
            .filter_map(|c| self.get_or_load(c).err())
            .collect()
    }

    pub fn is_loaded(&self, category: &str) -> bool {
        self.loaded.read().contains_key(category)
    }

    /// Names of loaded categories, sorted.
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Categories with a model file in the models directory, sorted.
    pub fn available_categories(&self) -> Result<Vec<String>, ArtifactError> {
        let dir = self.layout.model_dir(&self.models_dir);
        let entries = std::fs::read_dir(&dir).map_err(|source| ArtifactError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ArtifactError::Io {
                path: dir.clone(),
                source,
            })?;
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|f| self.layout.category_from_model_file(f))
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn is_valid_name(category: &str) -> bool {
    !category.is_empty()
        && category != "."
        && category != ".."
        && !category.contains(['/', '\\'])
}
