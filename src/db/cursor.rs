//! Row cursor interfaces.
//!
//! The materialization core consumes rows through two small traits: `RawRow`
//! for indexed raw-value access with a null indicator, and `RowCursor` for a
//! forward-only row sequence with column metadata. `MemoryCursor` is the
//! in-process implementation used by adapters and tests.

use crate::models::{CellValue, RowSchema};
use std::collections::VecDeque;

/// Indexed raw-value access to one row.
pub trait RawRow {
    /// Read the raw value at an ordinal. Out-of-range ordinals read as null.
    fn value(&self, ordinal: usize) -> CellValue;

    /// Check the null indicator for an ordinal.
    fn is_null(&self, ordinal: usize) -> bool {
        self.value(ordinal).is_null()
    }
}

/// One materialized raw row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<CellValue>,
}

impl Row {
    /// Create a row from cells in ordinal order.
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl RawRow for Row {
    fn value(&self, ordinal: usize) -> CellValue {
        self.cells.get(ordinal).cloned().unwrap_or(CellValue::Null)
    }
}

/// A forward-only sequence of rows with column metadata.
pub trait RowCursor {
    /// Get the column metadata shared by every row.
    fn schema(&self) -> &RowSchema;

    /// Take the next row, or `None` when the cursor is exhausted.
    fn next_row(&mut self) -> Option<Row>;
}

/// An in-memory row cursor.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    schema: RowSchema,
    rows: VecDeque<Row>,
}

impl MemoryCursor {
    /// Create an empty cursor over a schema.
    pub fn new(schema: RowSchema) -> Self {
        Self {
            schema,
            rows: VecDeque::new(),
        }
    }

    /// Create a cursor over prepared rows.
    pub fn from_rows(schema: RowSchema, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows: rows.into(),
        }
    }

    /// Append a row.
    pub fn push_row(mut self, row: Row) -> Self {
        self.rows.push_back(row);
        self
    }

    /// Get the number of rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowCursor for MemoryCursor {
    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn next_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }
}
