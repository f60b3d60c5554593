//! CSV decoding of raw exports and Parquet encoding of cleaned tables.

use crate::domain::model::{Column, ColumnData, Table};
use crate::utils::error::{EtlError, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

/// Reads a headed CSV export. Every field is text; empty fields are null and
/// short rows are padded with nulls.
pub fn decode_csv(data: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "row {} has {} fields but the header has {}",
                    line + 1,
                    record.len(),
                    headers.len()
                ),
            });
        }
        for (i, column) in values.iter_mut().enumerate() {
            let field = record.get(i).filter(|f| !f.is_empty());
            column.push(field.map(str::to_string));
        }
    }

    let num_rows = values.first().map(Vec::len).unwrap_or(0);
    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, data)| Column::new(name, ColumnData::Text(data)))
        .collect();

    Table::new(columns, num_rows).map_err(|message| EtlError::ProcessingError { message })
}

pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for column in table.columns() {
        let (data_type, array): (DataType, ArrayRef) = match &column.data {
            ColumnData::Integer(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
            ColumnData::Decimal(v) => (DataType::Float64, Arc::new(Float64Array::from(v.clone()))),
            ColumnData::Boolean(v) => (DataType::Boolean, Arc::new(BooleanArray::from(v.clone()))),
            ColumnData::Text(v) => (
                DataType::Utf8,
                Arc::new(v.iter().map(|s| s.as_deref()).collect::<StringArray>()),
            ),
            ColumnData::Timestamp(v) => {
                let tz = v
                    .iter()
                    .flatten()
                    .next()
                    .map(|ts| ts.offset().to_string())
                    .unwrap_or_else(|| "+00:00".to_string());
                let millis: Vec<Option<i64>> =
                    v.iter().map(|ts| ts.map(|t| t.timestamp_millis())).collect();
                (
                    DataType::Timestamp(TimeUnit::Millisecond, Some(tz.clone().into())),
                    Arc::new(TimestampMillisecondArray::from(millis).with_timezone(tz)),
                )
            }
        };
        fields.push(Field::new(column.name.clone(), data_type, true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
    Ok(batch)
}

pub fn encode_parquet(table: &Table) -> Result<Vec<u8>> {
    let batch = to_record_batch(table)?;
    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(properties))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buffer)
}
