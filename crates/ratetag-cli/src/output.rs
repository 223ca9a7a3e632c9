//! Rendering prediction results: CSV, TSV, JSON, YAML, or an aligned table.

use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::ValueEnum;
use ratetag_ai::ResultTable;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
    Yaml,
    Table,
}

/// One row per input (input order, duplicates repeated), one column per category.
pub fn to_record_batch(
    column: &str,
    inputs: &[String],
    categories: &[String],
    table: &ResultTable,
) -> anyhow::Result<RecordBatch> {
    let mut fields = vec![Field::new(column, DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(inputs))];
    for category in categories {
        fields.push(Field::new(category, DataType::Utf8, false));
        let labels = inputs
            .iter()
            .map(|input| table.get(input, category).unwrap_or(""));
        arrays.push(Arc::new(StringArray::from_iter_values(labels)));
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Row objects in input order, for JSON and YAML output.
pub fn to_json_rows(
    column: &str,
    inputs: &[String],
    categories: &[String],
    table: &ResultTable,
) -> Vec<Map<String, Value>> {
    inputs
        .iter()
        .map(|input| {
            let mut row = Map::new();
            row.insert(column.to_string(), Value::from(input.as_str()));
            for category in categories {
                let label = table.get(input, category).unwrap_or("");
                row.insert(category.clone(), Value::from(label));
            }
            row
        })
        .collect()
}

pub fn write_results(
    format: OutputFormat,
    column: &str,
    inputs: &[String],
    categories: &[String],
    table: &ResultTable,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv | OutputFormat::Tsv => {
            let batch = to_record_batch(column, inputs, categories, table)?;
            let delimiter = if format == OutputFormat::Tsv { b'\t' } else { b',' };
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .with_delimiter(delimiter)
                .build(&mut *out);
            writer.write(&batch)?;
        }
        OutputFormat::Table => {
            let batch = to_record_batch(column, inputs, categories, table)?;
            writeln!(out, "{}", pretty_format_batches(&[batch])?)?;
        }
        OutputFormat::Json => {
            let rows = to_json_rows(column, inputs, categories, table);
            serde_json::to_writer_pretty(&mut *out, &rows)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => {
            let rows = to_json_rows(column, inputs, categories, table);
            serde_yaml::to_writer(&mut *out, &rows)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Vec<String>, Vec<String>, ResultTable) {
        let inputs = vec!["Club Room".to_string(), "Sea View".to_string()];
        let categories = vec!["club".to_string(), "view".to_string()];
        let table = ResultTable::seeded(&inputs, &categories);
        (inputs, categories, table)
    }

    fn render(format: OutputFormat) -> String {
        let (inputs, categories, table) = fixture();
        let mut buf = Vec::new();
        write_results(format, "rate_name", &inputs, &categories, &table, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_header_starts_with_input_column() {
        let out = render(OutputFormat::Csv);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("rate_name,club,view"));
        assert_eq!(lines.next(), Some("Club Room,,"));
        assert_eq!(lines.next(), Some("Sea View,,"));
    }

    #[test]
    fn tsv_uses_tabs() {
        let out = render(OutputFormat::Tsv);
        assert_eq!(out.lines().next(), Some("rate_name\tclub\tview"));
    }

    #[test]
    fn json_rows_follow_input_order() {
        let out = render(OutputFormat::Json);
        let rows: Vec<Map<String, Value>> = serde_json::from_str(&out).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rate_name"], "Club Room");
        assert_eq!(rows[1]["rate_name"], "Sea View");
        assert_eq!(rows[1]["view"], "");
    }

    #[test]
    fn yaml_rows_follow_input_order() {
        let out = render(OutputFormat::Yaml);
        let rows: Vec<std::collections::BTreeMap<String, String>> =
            serde_yaml::from_str(&out).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rate_name"], "Club Room");
        assert_eq!(rows[1]["rate_name"], "Sea View");
        assert_eq!(rows[0]["club"], "");
    }

    #[test]
    fn table_mentions_every_column() {
        let out = render(OutputFormat::Table);
        for header in ["rate_name", "club", "view", "Club Room"] {
            assert!(out.contains(header), "{header} missing from:\n{out}");
        }
    }

    #[test]
    fn duplicate_inputs_repeat_rows() {
        let (_, categories, table) = fixture();
        let inputs = vec!["Sea View".to_string(), "Sea View".to_string()];
        let batch = to_record_batch("rate_name", &inputs, &categories, &table).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
    }
}
