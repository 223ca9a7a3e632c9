//! Multi-category prediction over a batch of rate names.
//!
//! The feature matrix is computed once and shared by every category. Each
//! category then runs on its own scoped thread (load → infer → merge), and
//! the result table is read only after every thread has joined.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use ratetag_core::{BatchVectorizer, ErrorPolicy, FeatureMatrix, TaggerConfig, VocabularyStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::category::CategoryModelSet;
use crate::engine::EngineLoader;
use crate::error::{CategoryError, PredictError};

/// input string → category → label.
///
/// Every requested (input, category) pair is present; an empty label means
/// the category failed or the row could not be decoded. Inputs are the keys,
/// so duplicate input strings share one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: HashMap<String, HashMap<String, String>>,
}

impl ResultTable {
    /// Table with every (input, category) slot set to the empty string.
    pub fn seeded<S: AsRef<str>>(inputs: &[S], categories: &[String]) -> Self {
        let mut rows = HashMap::with_capacity(inputs.len());
        for input in inputs {
            rows.entry(input.as_ref().to_string()).or_insert_with(|| {
                categories
                    .iter()
                    .map(|c| (c.clone(), String::new()))
                    .collect::<HashMap<_, _>>()
            });
        }
        Self { rows }
    }

    /// Label for one slot, `None` if the pair was never requested.
    pub fn get(&self, input: &str, category: &str) -> Option<&str> {
        self.rows.get(input)?.get(category).map(String::as_str)
    }

    /// Number of distinct inputs.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, HashMap<String, String>> {
        self.rows
    }

    /// Copy one category's labels in, pairing `labels[i]` with `inputs[i]`.
    fn merge_column<S: AsRef<str>>(&mut self, inputs: &[S], category: &str, labels: Vec<String>) {
        for (input, label) in inputs.iter().zip(labels) {
            if let Some(slot) = self
                .rows
                .get_mut(input.as_ref())
                .and_then(|row| row.get_mut(category))
            {
                *slot = label;
            }
        }
    }
}

/// Result table plus every per-category failure observed while building it.
#[derive(Debug)]
pub struct PredictionReport {
    pub table: ResultTable,
    pub categories: Vec<String>,
    pub failures: Vec<CategoryError>,
}

impl PredictionReport {
    /// True when every category produced a label for every row.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Categories whose whole column is empty because of a load or inference failure.
    pub fn failed_categories(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| f.is_fatal())
            .map(|f| f.category())
            .collect()
    }
}

/// Vocabulary, vectorizer pool, and category models for one tagging pipeline.
pub struct Predictor {
    config: TaggerConfig,
    vectorizer: BatchVectorizer,
    models: CategoryModelSet,
}

impl Predictor {
    /// Load the vocabulary named by `config` and prepare an empty model set.
    ///
    /// A missing or malformed vocabulary is a hard stop.
    pub fn open(config: TaggerConfig, loader: Arc<dyn EngineLoader>) -> Result<Self, PredictError> {
        let store = VocabularyStore::load(&config.vocabulary_path())?;
        Self::with_vocabulary(config, Arc::new(store), loader)
    }

    pub fn with_vocabulary(
        config: TaggerConfig,
        store: Arc<VocabularyStore>,
        loader: Arc<dyn EngineLoader>,
    ) -> Result<Self, PredictError> {
        let vectorizer = BatchVectorizer::new(store, config.workers)
            .map_err(|e| PredictError::ThreadPool(e.to_string()))?;
        let models = CategoryModelSet::new(config.models_dir.clone(), config.layout.clone(), loader);
        Ok(Self {
            config,
            vectorizer,
            models,
        })
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn vectorizer(&self) -> &BatchVectorizer {
        &self.vectorizer
    }

    pub fn models(&self) -> &CategoryModelSet {
        &self.models
    }

    /// Requested categories, deduplicated in order, or the configured defaults.
    pub fn resolve_categories(&self, requested: &[String]) -> Result<Vec<String>, PredictError> {
        let source = if requested.is_empty() {
            self.config.categories.as_slice()
        } else {
            requested
        };
        let mut seen = HashSet::new();
        let categories: Vec<String> = source
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect();
        if categories.is_empty() {
            return Err(PredictError::NoCategories);
        }
        Ok(categories)
    }

    /// Predict every category for every input.
    ///
    /// Under [`ErrorPolicy::BestEffort`] a failing category leaves its column
    /// empty and is listed in the report. Under [`ErrorPolicy::FailFast`] the
    /// first load or inference failure cancels categories that have not yet
    /// merged, and the call returns that failure once all workers have joined.
    pub fn predict_all<S: AsRef<str> + Sync>(
        &self,
        inputs: &[S],
        categories: &[String],
    ) -> Result<PredictionReport, PredictError> {
        let start = Instant::now();
        let categories = self.resolve_categories(categories)?;
        let table = Mutex::new(ResultTable::seeded(inputs, &categories));

        if inputs.is_empty() {
            return Ok(PredictionReport {
                table: table.into_inner(),
                categories,
                failures: Vec::new(),
            });
        }

        let features = self.vectorizer.vectorize_all(inputs);
        let failures = Mutex::new(Vec::new());
        let cancelled = AtomicBool::new(false);
        let fail_fast = self.config.error_policy == ErrorPolicy::FailFast;

        std::thread::scope(|scope| {
            for category in &categories {
                let (features, table, failures, cancelled) =
                    (&features, &table, &failures, &cancelled);
                scope.spawn(move || {
                    let outcome = self.run_category(category, inputs, features, table, cancelled);
                    for failure in outcome {
                        if failure.is_fatal() {
                            warn!(category = %category, error = %failure, "category failed");
                            if fail_fast {
                                cancelled.store(true, Ordering::SeqCst);
                            }
                        } else {
                            warn!(category = %category, error = %failure, "category incomplete");
                        }
                        failures.lock().push(failure);
                    }
                });
            }
        });

        let mut failures = failures.into_inner();
        if fail_fast && let Some(pos) = failures.iter().position(CategoryError::is_fatal) {
            return Err(PredictError::Category(failures.swap_remove(pos)));
        }

        info!(
            inputs = inputs.len(),
            categories = categories.len(),
            failures = failures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "prediction complete"
        );
        Ok(PredictionReport {
            table: table.into_inner(),
            categories,
            failures,
        })
    }

    /// Predict one input, returning category → label.
    pub fn predict_one(
        &self,
        input: &str,
        categories: &[String],
    ) -> Result<(HashMap<String, String>, Vec<CategoryError>), PredictError> {
        let report = self.predict_all(&[input], categories)?;
        let row = report
            .table
            .into_inner()
            .remove(input)
            .unwrap_or_default();
        Ok((row, report.failures))
    }

    /// Load, infer, and merge one category. Returns the failures it hit.
    fn run_category<S: AsRef<str>>(
        &self,
        category: &str,
        inputs: &[S],
        features: &FeatureMatrix,
        table: &Mutex<ResultTable>,
        cancelled: &AtomicBool,
    ) -> Vec<CategoryError> {
        let is_cancelled = || {
            cancelled
                .load(Ordering::SeqCst)
                .then(|| CategoryError::Cancelled {
                    category: category.to_string(),
                })
        };

        if let Some(c) = is_cancelled() {
            return vec![c];
        }
        let model = match self.models.get_or_load(category) {
            Ok(model) => model,
            Err(e) => return vec![e],
        };
        if let Some(c) = is_cancelled() {
            return vec![c];
        }
        let decoded = match model.infer(features) {
            Ok(decoded) => decoded,
            Err(e) => return vec![e],
        };
        if let Some(c) = is_cancelled() {
            return vec![c];
        }

        table.lock().merge_column(inputs, category, decoded.labels);

        if decoded.undecoded.is_empty() {
            Vec::new()
        } else {
            vec![CategoryError::Decode {
                category: category.to_string(),
                rows: decoded.undecoded,
            }]
        }
    }
}
