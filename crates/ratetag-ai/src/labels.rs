//! Per-category class-name artifacts.
//!
//! A label file is a JSON array of class names in the model's class order,
//! e.g. `["not club", "club"]`. Index 0 is the negative/default class for
//! binary categories.

use std::path::Path;

use ratetag_core::{ArtifactError, read_json};

/// Minimum number of classes a category can have.
pub const MIN_CLASSES: usize = 2;

/// Load an ordered label list, rejecting lists with fewer than two classes.
pub fn load_labels(path: &Path) -> Result<Vec<String>, ArtifactError> {
    let labels: Vec<String> = read_json(path)?;
    if labels.len() < MIN_CLASSES {
        return Err(ArtifactError::invalid(
            path,
            format!("expected at least {MIN_CLASSES} labels, found {}", labels.len()),
        ));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_in_file_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(tmp.path(), "labels_view.json", r#"["no view", "sea", "city"]"#);
        assert_eq!(load_labels(&path).unwrap(), vec!["no view", "sea", "city"]);
    }

    #[test]
    fn single_label_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(tmp.path(), "labels_club.json", r#"["club"]"#);
        assert!(matches!(
            load_labels(&path),
            Err(ArtifactError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            load_labels(Path::new("/nonexistent/labels_view.json")),
            Err(ArtifactError::NotFound(_))
        ));
    }
}
