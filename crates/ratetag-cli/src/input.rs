//! Rate names from a CSV file or a literal argument.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};

/// Treat `input` as a CSV path if such a file exists, otherwise as one rate name.
pub fn read_inputs(input: &str, column: &str) -> anyhow::Result<Vec<String>> {
    let path = Path::new(input);
    if path.is_file() {
        read_csv_column(path, column)
    } else {
        Ok(vec![input.to_string()])
    }
}

/// Read one column of a headed CSV file. Blank cells become empty strings.
pub fn read_csv_column(path: &Path, column: &str) -> anyhow::Result<Vec<String>> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, None)
        .with_context(|| format!("reading CSV header of {}", path.display()))?;
    file.rewind()?;

    // Every column as text so numeric-looking names stay verbatim.
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    if schema.index_of(column).is_err() {
        let available: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        bail!(
            "column `{column}` not found in {} (columns: {})",
            path.display(),
            available.join(", ")
        );
    }

    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .build(file)
        .with_context(|| format!("opening CSV reader for {}", path.display()))?;

    let mut texts = Vec::new();
    for batch in reader {
        let batch = batch.with_context(|| format!("parsing {}", path.display()))?;
        let array = batch
            .column_by_name(column)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .with_context(|| format!("column `{column}` is not text"))?;
        texts.extend((0..array.len()).map(|i| {
            if array.is_null(i) {
                String::new()
            } else {
                array.value(i).to_string()
            }
        }));
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("rates.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_named_column_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = csv(
            tmp.path(),
            "hotel_id,rate_name\n1,\"Club Room, Sea View\"\n2,\n3,Standard Double\n4,101\n",
        );
        let texts = read_csv_column(&path, "rate_name").unwrap();
        assert_eq!(texts, vec!["Club Room, Sea View", "", "Standard Double", "101"]);
    }

    #[test]
    fn missing_column_lists_available() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = csv(tmp.path(), "hotel_id,name\n1,Club\n");
        let err = read_csv_column(&path, "rate_name").unwrap_err().to_string();
        assert!(err.contains("rate_name"), "{err}");
        assert!(err.contains("hotel_id, name"), "{err}");
    }

    #[test]
    fn non_file_argument_is_a_single_input() {
        let texts = read_inputs("Deluxe King Ocean View", "rate_name").unwrap();
        assert_eq!(texts, vec!["Deluxe King Ocean View"]);
    }

    #[test]
    fn existing_file_argument_is_read_as_csv() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = csv(tmp.path(), "rate_name\nClub\nSuite\n");
        let texts = read_inputs(path.to_str().unwrap(), "rate_name").unwrap();
        assert_eq!(texts, vec!["Club", "Suite"]);
    }
}
