use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::{CombinedDataset, TableValue};

// ---------------------------------------------------------------------------
// Parquet serialization of the combined dataset
// ---------------------------------------------------------------------------

/// Output schema: every table melted into long form.
///
/// One record per cell — `(table, row, column)` addresses the cell, and
/// exactly one of the four typed value columns is non-null (a Null cell
/// leaves all four null). Tables are visited in name order and rows in
/// table order, so equal datasets serialize byte-for-byte identically.
fn output_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("table", DataType::Utf8, false),
        Field::new("row", DataType::Int64, false),
        Field::new("column", DataType::Utf8, false),
        Field::new("string_value", DataType::Utf8, true),
        Field::new("int_value", DataType::Int64, true),
        Field::new("float_value", DataType::Float64, true),
        Field::new("bool_value", DataType::Boolean, true),
    ]))
}

impl CombinedDataset {
    /// Write the dataset to one Parquet file at `path`, overwriting any
    /// existing file. The single output operation of a combined dataset.
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        let mut table_b = StringBuilder::new();
        let mut row_b = Int64Builder::new();
        let mut column_b = StringBuilder::new();
        let mut string_b = StringBuilder::new();
        let mut int_b = Int64Builder::new();
        let mut float_b = Float64Builder::new();
        let mut bool_b = BooleanBuilder::new();

        for (table_name, table) in &self.tables {
            for (row_idx, row) in table.rows.iter().enumerate() {
                for (cell, column) in row.iter().zip(&table.columns) {
                    table_b.append_value(table_name);
                    row_b.append_value(row_idx as i64);
                    column_b.append_value(column);

                    match cell {
                        TableValue::String(s) => {
                            string_b.append_value(s);
                            int_b.append_null();
                            float_b.append_null();
                            bool_b.append_null();
                        }
                        TableValue::Integer(i) => {
                            string_b.append_null();
                            int_b.append_value(*i);
                            float_b.append_null();
                            bool_b.append_null();
                        }
                        TableValue::Float(f) => {
                            string_b.append_null();
                            int_b.append_null();
                            float_b.append_value(*f);
                            bool_b.append_null();
                        }
                        TableValue::Bool(b) => {
                            string_b.append_null();
                            int_b.append_null();
                            float_b.append_null();
                            bool_b.append_value(*b);
                        }
                        TableValue::Null => {
                            string_b.append_null();
                            int_b.append_null();
                            float_b.append_null();
                            bool_b.append_null();
                        }
                    }
                }
            }
        }

        let schema = output_schema();
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(table_b.finish()),
            Arc::new(row_b.finish()),
            Arc::new(column_b.finish()),
            Arc::new(string_b.finish()),
            Arc::new(int_b.finish()),
            Arc::new(float_b.finish()),
            Arc::new(bool_b.finish()),
        ];
        let batch = RecordBatch::try_new(schema.clone(), arrays)
            .context("building output record batch")?;

        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut writer = ArrowWriter::try_new(file, schema, None)
            .context("creating parquet writer")?;
        writer.write(&batch).context("writing parquet batch")?;
        writer.close().context("closing parquet writer")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;
    use crate::data::model::DataTable;

    fn sample_dataset(rows: usize) -> CombinedDataset {
        let mut table = DataTable::new(["atomic_number", "symbol", "mass", "stable"]);
        for i in 0..rows {
            table
                .push_row(vec![
                    TableValue::Integer(i as i64 + 1),
                    TableValue::String(format!("E{i}")),
                    TableValue::Float((i as f64 + 1.0) * 1.008),
                    if i == 0 {
                        TableValue::Bool(true)
                    } else {
                        TableValue::Null
                    },
                ])
                .unwrap();
        }
        let mut dataset = CombinedDataset::default();
        dataset.insert_table("atom_data", table);
        dataset
    }

    #[test]
    fn melts_every_cell_into_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        sample_dataset(3).write_parquet(&path).unwrap();

        let file = fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let total_rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        // 3 rows × 4 columns.
        assert_eq!(total_rows, 12);
    }

    #[test]
    fn identical_datasets_serialize_identically() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.parquet");
        let b = dir.path().join("b.parquet");
        sample_dataset(4).write_parquet(&a).unwrap();
        sample_dataset(4).write_parquet(&b).unwrap();
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn rewriting_overwrites_the_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");

        sample_dataset(100).write_parquet(&path).unwrap();
        let large = fs::read(&path).unwrap();

        sample_dataset(1).write_parquet(&path).unwrap();
        let small = fs::read(&path).unwrap();

        assert_ne!(large, small);

        // The overwrite leaves exactly what a fresh write produces.
        let fresh = dir.path().join("fresh.parquet");
        sample_dataset(1).write_parquet(&fresh).unwrap();
        assert_eq!(small, fs::read(&fresh).unwrap());
    }
}
