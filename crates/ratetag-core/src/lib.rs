//! Core types for rate-name tagging: vocabulary artifacts, the character n-gram
//! TF-IDF vectorizer, and shared configuration.

pub mod batch;
pub mod config;
mod error;
pub mod vectorizer;
pub mod vocabulary;

pub use batch::{BatchVectorizer, FeatureMatrix};
pub use config::{ArtifactLayout, ErrorPolicy, TaggerConfig};
pub use error::{ArtifactError, VocabularyError, read_json};
pub use vectorizer::{sparse_weights, vectorize};
pub use vocabulary::VocabularyStore;
