//! SQLite row adapter.
//!
//! Bridges `sqlx` SQLite result rows into the engine's schema and raw-row
//! model. Type conversion uses a two-phase approach: the reported column
//! type is classified into a `TypeTag`, then a tag-specific decoder extracts
//! the raw value. Decode failures degrade to text and finally to null so a
//! single odd column never aborts cursor extraction.

use crate::db::cursor::{MemoryCursor, Row};
use crate::models::{CellValue, RowSchema, TypeTag};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo};
use tracing::warn;

/// Classify a SQLite column type name into a type tag.
pub fn categorize_type(type_name: &str) -> TypeTag {
    let lower = type_name.to_lowercase();

    // Boolean before integer: sqlite reports BOOLEAN columns with an
    // integer affinity name.
    if lower.contains("bool") {
        return TypeTag::Bool;
    }

    if lower.contains("int") {
        return TypeTag::Integer;
    }

    if lower.contains("real")
        || lower.contains("floa")
        || lower.contains("doub")
        || lower.contains("decimal")
        || lower.contains("numeric")
    {
        return TypeTag::Float;
    }

    if lower.contains("date") || lower.contains("time") {
        return TypeTag::Timestamp;
    }

    if lower == "uuid" || lower == "guid" {
        return TypeTag::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") {
        return TypeTag::Bytes;
    }

    if lower.contains("char") || lower.contains("clob") || lower.contains("text") {
        return TypeTag::Text;
    }

    TypeTag::Unknown
}

/// Build the schema descriptor for a SQLite result row.
pub fn schema_of(row: &SqliteRow) -> RowSchema {
    RowSchema::from_columns(
        row.columns()
            .iter()
            .map(|col| (col.name().to_string(), categorize_type(col.type_info().name()))),
    )
}

/// Decode one SQLite result row against a previously extracted schema.
pub fn decode_row(row: &SqliteRow, schema: &RowSchema) -> Row {
    Row::new(
        schema
            .columns()
            .iter()
            .map(|column| decode_cell(row, column.ordinal, column.source_type))
            .collect(),
    )
}

/// Convert a batch of SQLite rows into an in-memory cursor.
///
/// The schema comes from the first row's metadata; an empty batch yields an
/// empty cursor with an empty schema.
pub fn cursor_from_rows(rows: &[SqliteRow]) -> MemoryCursor {
    let Some(first) = rows.first() else {
        return MemoryCursor::new(RowSchema::default());
    };
    let schema = schema_of(first);
    let decoded = rows.iter().map(|row| decode_row(row, &schema)).collect();
    MemoryCursor::from_rows(schema, decoded)
}

fn decode_cell(row: &SqliteRow, idx: usize, tag: TypeTag) -> CellValue {
    match tag {
        TypeTag::Bool => decode_bool(row, idx),
        TypeTag::Integer => decode_integer(row, idx),
        TypeTag::Float => decode_float(row, idx),
        TypeTag::Bytes => decode_bytes(row, idx),
        TypeTag::Timestamp => decode_timestamp(row, idx),
        TypeTag::Uuid => decode_uuid(row, idx),
        _ => decode_text(row, idx),
    }
}

fn decode_bool(row: &SqliteRow, idx: usize) -> CellValue {
    row.try_get::<Option<bool>, _>(idx)
        .ok()
        .flatten()
        .map(CellValue::Bool)
        .unwrap_or(CellValue::Null)
}

fn decode_integer(row: &SqliteRow, idx: usize) -> CellValue {
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return CellValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return CellValue::Int(v as i64);
    }
    CellValue::Null
}

fn decode_float(row: &SqliteRow, idx: usize) -> CellValue {
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return CellValue::Float(v);
    }
    // DECIMAL columns sometimes surface as text.
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        if let Ok(parsed) = v.trim().parse::<f64>() {
            return CellValue::Float(parsed);
        }
        warn!(idx, value = %v, "decimal column did not parse as a number");
        return CellValue::Text(v);
    }
    CellValue::Null
}

fn decode_bytes(row: &SqliteRow, idx: usize) -> CellValue {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(CellValue::Bytes)
        .unwrap_or(CellValue::Null)
}

fn decode_timestamp(row: &SqliteRow, idx: usize) -> CellValue {
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return CellValue::Timestamp(v.and_utc());
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return CellValue::Timestamp(v);
    }
    // Fall back to the stored text so the coercer can parse it.
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return CellValue::Text(v);
    }
    CellValue::Null
}

fn decode_uuid(row: &SqliteRow, idx: usize) -> CellValue {
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        match uuid::Uuid::parse_str(v.trim()) {
            Ok(parsed) => return CellValue::Uuid(parsed),
            Err(_) => {
                warn!(idx, value = %v, "uuid column did not parse; keeping text");
                return CellValue::Text(v);
            }
        }
    }
    CellValue::Null
}

fn decode_text(row: &SqliteRow, idx: usize) -> CellValue {
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return CellValue::Text(v);
    }
    // Unknown columns (expressions, affinity-less values) may carry any
    // storage class; try the remaining ones before giving up.
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return CellValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return CellValue::Float(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return CellValue::Bytes(v);
    }
    CellValue::Null
}
