//! Order-preserving parallel vectorization.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::vectorizer::vectorize_into;
use crate::vocabulary::VocabularyStore;

/// Row-major feature matrix, one fixed-width row per input string.
///
/// Row `i` always corresponds to input `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    rows: usize,
    width: usize,
}

impl FeatureMatrix {
    /// Zero-filled matrix of `rows × width`.
    pub fn zeros(rows: usize, width: usize) -> Self {
        Self {
            data: vec![0.0; rows * width],
            rows,
            width,
        }
    }

    /// Build from a flat row-major buffer. Returns `None` if the length does not match.
    pub fn from_row_major(data: Vec<f32>, rows: usize, width: usize) -> Option<Self> {
        (data.len() == rows * width).then_some(Self { data, rows, width })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(|i| self.row(i))
    }

    /// The whole matrix as one contiguous row-major slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Fixed-size worker pool that vectorizes many inputs against one vocabulary.
pub struct BatchVectorizer {
    store: Arc<VocabularyStore>,
    pool: ThreadPool,
}

impl BatchVectorizer {
    /// Create a vectorizer with `workers` threads, or one per available core.
    pub fn new(
        store: Arc<VocabularyStore>,
        workers: Option<usize>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.filter(|&n| n > 0).unwrap_or_else(available_workers);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ratetag-vectorize-{i}"))
            .build()?;
        Ok(Self { store, pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Vectorize every text; row `i` of the result is the vector of `texts[i]`.
    ///
    /// Each worker writes directly into its row's pre-allocated slice, so the
    /// output order never depends on completion order.
    pub fn vectorize_all<S: AsRef<str> + Sync>(&self, texts: &[S]) -> FeatureMatrix {
        let start = Instant::now();
        let width = self.store.len();
        let mut matrix = FeatureMatrix::zeros(texts.len(), width);
        if texts.is_empty() {
            return matrix;
        }

        let store = self.store.as_ref();
        self.pool.install(|| {
            matrix
                .data
                .par_chunks_mut(width)
                .zip(texts.par_iter())
                .for_each(|(slot, text)| vectorize_into(text.as_ref(), store, slot));
        });

        debug!(
            rows = texts.len(),
            width,
            workers = self.workers(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "vectorized batch"
        );
        matrix
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::vectorize;

    fn store() -> Arc<VocabularyStore> {
        let terms = [" s", "sea", "vie", "iew", "dou", "ble", "sui", "ite", "e", "o"];
        let vocab = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as u32))
            .collect();
        let idf = (0..terms.len()).map(|i| 1.0 + i as f64 * 0.1).collect();
        Arc::new(VocabularyStore::from_parts(vocab, idf).unwrap())
    }

    fn inputs() -> Vec<String> {
        (0..97)
            .map(|i| match i % 4 {
                0 => format!("Double Room {i}"),
                1 => "Sea View Suite".to_string(),
                2 => String::new(),
                _ => format!("suite {i} double sea view"),
            })
            .collect()
    }

    #[test]
    fn rows_match_single_vectorize_for_any_worker_count() {
        let s = store();
        let texts = inputs();
        for workers in [1, 2, 3, 8] {
            let batch = BatchVectorizer::new(s.clone(), Some(workers)).unwrap();
            let matrix = batch.vectorize_all(&texts);
            assert_eq!(matrix.rows(), texts.len());
            assert_eq!(matrix.width(), s.len());
            for (i, text) in texts.iter().enumerate() {
                assert_eq!(
                    matrix.row(i),
                    vectorize(text, &s).as_slice(),
                    "row {i} with {workers} workers"
                );
            }
        }
    }

    #[test]
    fn empty_batch() {
        let batch = BatchVectorizer::new(store(), Some(2)).unwrap();
        let matrix = batch.vectorize_all::<&str>(&[]);
        assert!(matrix.is_empty());
        assert!(matrix.as_slice().is_empty());
    }

    #[test]
    fn default_worker_count_is_positive() {
        let batch = BatchVectorizer::new(store(), None).unwrap();
        assert!(batch.workers() >= 1);
    }

    #[test]
    fn from_row_major_checks_length() {
        assert!(FeatureMatrix::from_row_major(vec![0.0; 6], 2, 3).is_some());
        assert!(FeatureMatrix::from_row_major(vec![0.0; 5], 2, 3).is_none());
    }

    #[test]
    fn iter_rows_yields_each_row() {
        let m = FeatureMatrix::from_row_major(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        let rows: Vec<&[f32]> = m.iter_rows().collect();
        assert_eq!(rows, vec![&[1.0, 2.0][..], &[3.0, 4.0][..]]);
    }
}
