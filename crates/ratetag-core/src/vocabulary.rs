//! Precomputed character n-gram vocabulary with per-term IDF weights.
//!
//! The artifact is produced by the training pipeline as JSON:
//!
//! ```json
//! { "vocabulary": { " a": 0, "an": 1 }, "idf_values": [1.42, 2.07] }
//! ```
//!
//! Indices must be dense and contiguous from 0, one IDF weight per index.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{ArtifactError, VocabularyError, read_json};

#[derive(Deserialize)]
struct VocabularyArtifact {
    vocabulary: HashMap<String, u32>,
    idf_values: Vec<f64>,
}

/// Immutable term → feature-index mapping plus index-aligned IDF weights.
///
/// Shared read-only across vectorization workers; there are no mutating
/// operations after construction.
#[derive(Debug, Clone)]
pub struct VocabularyStore {
    terms: HashMap<String, usize>,
    idf: Vec<f64>,
    // Smallest term per index, for reverse lookup.
    by_index: Vec<String>,
}

impl VocabularyStore {
    /// Load and validate a vocabulary artifact.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let artifact: VocabularyArtifact = read_json(path)?;
        let store = Self::from_parts(artifact.vocabulary, artifact.idf_values)
            .map_err(|e| ArtifactError::invalid(path, e.to_string()))?;
        info!(
            terms = store.terms.len(),
            dim = store.len(),
            path = %path.display(),
            "loaded vocabulary"
        );
        Ok(store)
    }

    /// Build a store from an in-memory mapping, checking the index invariants.
    ///
    /// Every index must address a slot in `idf`, and the distinct indices must
    /// cover `idf` exactly.
    pub fn from_parts(
        vocabulary: HashMap<String, u32>,
        idf: Vec<f64>,
    ) -> Result<Self, VocabularyError> {
        if vocabulary.is_empty() || idf.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let mut by_index: Vec<Option<String>> = vec![None; idf.len()];
        let mut terms = HashMap::with_capacity(vocabulary.len());
        for (term, index) in vocabulary {
            let index = index as usize;
            let Some(slot) = by_index.get_mut(index) else {
                return Err(VocabularyError::IndexOutOfRange {
                    term,
                    index,
                    len: idf.len(),
                });
            };
            if slot.as_ref().is_none_or(|t| term < *t) {
                *slot = Some(term.clone());
            }
            terms.insert(term, index);
        }

        let distinct = by_index.iter().filter(|t| t.is_some()).count();
        if distinct != idf.len() {
            return Err(VocabularyError::IndexCount {
                distinct,
                len: idf.len(),
            });
        }
        if let Some(index) = idf.iter().position(|w| !w.is_finite()) {
            return Err(VocabularyError::NonFiniteIdf { index });
        }

        Ok(Self {
            terms,
            idf,
            by_index: by_index.into_iter().flatten().collect(),
        })
    }

    /// Feature dimensionality (length of every vector produced against this store).
    pub fn len(&self) -> usize {
        self.idf.len()
    }

    /// Always false for a validated store.
    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get(term).copied()
    }

    pub fn idf(&self, index: usize) -> f64 {
        self.idf[index]
    }

    /// Reverse lookup. When several terms share an index, the smallest wins.
    pub fn term_at(&self, index: usize) -> Option<&str> {
        self.by_index.get(index).map(String::as_str)
    }
}
