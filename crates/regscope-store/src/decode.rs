//! Arrow → [`Regulation`] decoding for rows read from the `regulations` table.
//!
//! This is the only place the JSON text columns are parsed back into
//! [`Metadata`] maps.

use arrow::array::{
    Array, Date32Array, Int64Array, LargeStringArray, StringArray, StringViewArray,
    TimestampMicrosecondArray, TimestampNanosecondArray,
};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use regscope_core::{Metadata, Regulation};

use crate::StoreError;

/// Decode every row of every batch, in batch order.
pub(crate) fn regulations(batches: &[RecordBatch]) -> Result<Vec<Regulation>, StoreError> {
    let total: usize = batches.iter().map(|b| b.num_rows()).sum();
    let mut out = Vec::with_capacity(total);

    for batch in batches {
        let id = column(batch, "id")?;
        let title = column(batch, "title")?;
        let part = column(batch, "part")?;
        let section = column(batch, "section")?;
        let full_text = column(batch, "full_text")?;
        let starts_on = column(batch, "starts_on")?;
        let ends_on = column(batch, "ends_on")?;
        let hierarchy = column(batch, "hierarchy")?;
        let hierarchy_headings = column(batch, "hierarchy_headings")?;
        let headings = column(batch, "headings")?;
        let last_updated = column(batch, "last_updated")?;

        for row in 0..batch.num_rows() {
            out.push(Regulation {
                id: get_i64(id, row)?,
                title: get_string(title, row)?,
                part: get_string(part, row)?,
                section: get_string(section, row)?,
                full_text: get_string(full_text, row)?.unwrap_or_default(),
                starts_on: get_date(starts_on, row)?,
                ends_on: get_date(ends_on, row)?,
                hierarchy: get_metadata(hierarchy, row)?,
                hierarchy_headings: get_metadata(hierarchy_headings, row)?,
                headings: get_metadata(headings, row)?,
                last_updated: get_timestamp(last_updated, row)?,
            });
        }
    }

    Ok(out)
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a dyn Array, StoreError> {
    batch
        .column_by_name(name)
        .map(|c| c.as_ref())
        .ok_or_else(|| StoreError::Decode(format!("missing '{name}' column")))
}

fn unexpected(col: &dyn Array, what: &str) -> StoreError {
    StoreError::Decode(format!("{what} column has type {:?}", col.data_type()))
}

fn get_i64(col: &dyn Array, row: usize) -> Result<Option<i64>, StoreError> {
    if col.is_null(row) {
        return Ok(None);
    }
    col.as_any()
        .downcast_ref::<Int64Array>()
        .map(|arr| Some(arr.value(row)))
        .ok_or_else(|| unexpected(col, "integer"))
}

/// Handles `Utf8`, `LargeUtf8` and `Utf8View` layouts.
fn get_string(col: &dyn Array, row: usize) -> Result<Option<String>, StoreError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<StringArray>() {
        Ok(Some(arr.value(row).to_string()))
    } else if let Some(arr) = any.downcast_ref::<LargeStringArray>() {
        Ok(Some(arr.value(row).to_string()))
    } else if let Some(arr) = any.downcast_ref::<StringViewArray>() {
        Ok(Some(arr.value(row).to_string()))
    } else {
        Err(unexpected(col, "string"))
    }
}

fn get_date(col: &dyn Array, row: usize) -> Result<Option<NaiveDate>, StoreError> {
    if col.is_null(row) {
        return Ok(None);
    }
    col.as_any()
        .downcast_ref::<Date32Array>()
        .map(|arr| arr.value_as_date(row))
        .ok_or_else(|| unexpected(col, "date"))
}

fn get_timestamp(col: &dyn Array, row: usize) -> Result<Option<NaiveDateTime>, StoreError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<TimestampMicrosecondArray>() {
        Ok(arr.value_as_datetime(row))
    } else if let Some(arr) = any.downcast_ref::<TimestampNanosecondArray>() {
        Ok(arr.value_as_datetime(row))
    } else {
        Err(unexpected(col, "timestamp"))
    }
}

fn get_metadata(col: &dyn Array, row: usize) -> Result<Metadata, StoreError> {
    match get_string(col, row)? {
        Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(&text)?),
        _ => Ok(Metadata::new()),
    }
}
