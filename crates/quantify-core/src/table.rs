//! Conversions between pipeline tables and Arrow record batches.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, StringArray, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;

use crate::record::{Dimension, RawTable, RawTableId, SourceRecord};
use crate::report::{FigurePoint, ReportFigure};
use crate::schema::tables;
use crate::summary::{SummaryRow, SummaryTable};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("null {column} at row {row}")]
    NullValue { column: String, row: usize },
}

impl RawTable {
    pub fn to_batch(&self) -> Result<RecordBatch, TableError> {
        let r = &self.records;
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(r.iter().map(|x| x.source.as_str()))),
            Arc::new(StringArray::from_iter_values(r.iter().map(|x| x.legal_tool.as_str()))),
            Arc::new(r.iter().map(|x| x.country.as_deref()).collect::<StringArray>()),
            Arc::new(r.iter().map(|x| x.language.as_deref()).collect::<StringArray>()),
            Arc::new(r.iter().map(|x| x.subject.as_deref()).collect::<StringArray>()),
            Arc::new(r.iter().map(|x| x.publisher.as_deref()).collect::<StringArray>()),
            Arc::new(r.iter().map(|x| x.publisher_country.as_deref()).collect::<StringArray>()),
            Arc::new(r.iter().map(|x| x.year).collect::<Int32Array>()),
            Arc::new(UInt64Array::from_iter_values(r.iter().map(|x| x.count))),
        ];
        Ok(RecordBatch::try_new(Arc::new(tables::raw_schema()), columns)?)
    }

    /// Rebuild a raw table from batches read with [`tables::raw_schema`].
    pub fn from_batches(
        id: RawTableId,
        dimensions: Vec<Dimension>,
        batches: &[RecordBatch],
    ) -> Result<Self, TableError> {
        let mut table = RawTable::new(id, dimensions);
        for batch in batches {
            let source = column::<StringArray>(batch, tables::SOURCE, "Utf8")?;
            let legal_tool = column::<StringArray>(batch, tables::LEGAL_TOOL, "Utf8")?;
            let country = column::<StringArray>(batch, tables::COUNTRY, "Utf8")?;
            let language = column::<StringArray>(batch, tables::LANGUAGE, "Utf8")?;
            let subject = column::<StringArray>(batch, tables::SUBJECT, "Utf8")?;
            let publisher = column::<StringArray>(batch, tables::PUBLISHER, "Utf8")?;
            let publisher_country =
                column::<StringArray>(batch, tables::PUBLISHER_COUNTRY, "Utf8")?;
            let year = column::<Int32Array>(batch, tables::YEAR, "Int32")?;
            let count = column::<UInt64Array>(batch, tables::COUNT, "UInt64")?;

            for row in 0..batch.num_rows() {
                table.records.push(SourceRecord {
                    source: required_string(source, tables::SOURCE, row)?,
                    legal_tool: required_string(legal_tool, tables::LEGAL_TOOL, row)?,
                    country: optional_string(country, row),
                    language: optional_string(language, row),
                    subject: optional_string(subject, row),
                    publisher: optional_string(publisher, row),
                    publisher_country: optional_string(publisher_country, row),
                    year: (!year.is_null(row)).then(|| year.value(row)),
                    count: required_u64(count, tables::COUNT, row)?,
                });
            }
        }
        Ok(table)
    }
}

impl SummaryTable {
    pub fn to_batch(&self) -> Result<RecordBatch, TableError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(self.rows.iter().map(|r| r.key.as_str()))),
            Arc::new(UInt64Array::from_iter_values(self.rows.iter().map(|r| r.count))),
            Arc::new(Float64Array::from_iter_values(self.rows.iter().map(|r| r.percentage))),
        ];
        let schema = tables::summary_schema(self.dimension);
        Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
    }

    /// Read summary rows back from batches read with [`tables::summary_schema`].
    pub fn rows_from_batches(
        dimension: Dimension,
        batches: &[RecordBatch],
    ) -> Result<Vec<SummaryRow>, TableError> {
        let key_name = dimension.slug();
        let mut rows = Vec::new();
        for batch in batches {
            let key = column::<StringArray>(batch, key_name, "Utf8")?;
            let count = column::<UInt64Array>(batch, tables::COUNT, "UInt64")?;
            let percentage = column::<Float64Array>(batch, tables::PERCENTAGE, "Float64")?;
            for row in 0..batch.num_rows() {
                rows.push(SummaryRow {
                    key: required_string(key, key_name, row)?,
                    count: required_u64(count, tables::COUNT, row)?,
                    percentage: required_f64(percentage, tables::PERCENTAGE, row)?,
                });
            }
        }
        Ok(rows)
    }
}

impl ReportFigure {
    pub fn to_batch(&self) -> Result<RecordBatch, TableError> {
        let p = &self.points;
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(p.iter().map(|x| x.label.as_str()))),
            Arc::new(UInt64Array::from_iter_values(p.iter().map(|x| x.value))),
            Arc::new(Float64Array::from_iter_values(p.iter().map(|x| x.percentage))),
        ];
        Ok(RecordBatch::try_new(Arc::new(tables::figure_schema()), columns)?)
    }

    pub fn points_from_batches(batches: &[RecordBatch]) -> Result<Vec<FigurePoint>, TableError> {
        let mut points = Vec::new();
        for batch in batches {
            let label = column::<StringArray>(batch, tables::LABEL, "Utf8")?;
            let value = column::<UInt64Array>(batch, tables::VALUE, "UInt64")?;
            let percentage = column::<Float64Array>(batch, tables::PERCENTAGE, "Float64")?;
            for row in 0..batch.num_rows() {
                points.push(FigurePoint {
                    label: required_string(label, tables::LABEL, row)?,
                    value: required_u64(value, tables::VALUE, row)?,
                    percentage: required_f64(percentage, tables::PERCENTAGE, row)?,
                });
            }
        }
        Ok(points)
    }
}

// ── Column helpers ──

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &'static str,
) -> Result<&'a T, TableError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| TableError::MissingColumn(name.to_string()))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| TableError::ColumnType {
            column: name.to_string(),
            expected,
        })
}

fn optional_string(col: &StringArray, row: usize) -> Option<String> {
    (!col.is_null(row)).then(|| col.value(row).to_string())
}

fn required_string(col: &StringArray, name: &str, row: usize) -> Result<String, TableError> {
    optional_string(col, row).ok_or_else(|| null_value(name, row))
}

fn required_u64(col: &UInt64Array, name: &str, row: usize) -> Result<u64, TableError> {
    if col.is_null(row) {
        return Err(null_value(name, row));
    }
    Ok(col.value(row))
}

fn required_f64(col: &Float64Array, name: &str, row: usize) -> Result<f64, TableError> {
    if col.is_null(row) {
        return Err(null_value(name, row));
    }
    Ok(col.value(row))
}

fn null_value(name: &str, row: usize) -> TableError {
    TableError::NullValue {
        column: name.to_string(),
        row,
    }
}
