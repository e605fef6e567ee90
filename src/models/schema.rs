//! Schema descriptor.
//!
//! This module defines the column metadata of one result-row shape: ordinal
//! position, name, and the value type the cursor reports. A schema is built
//! once per distinct query execution shape and never changes afterwards.

use crate::config::MaterializeOptions;
use crate::models::TypeTag;
use serde::{Deserialize, Serialize};

/// One column of a result-row schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Zero-based position within the row.
    pub ordinal: usize,
    /// Column name as reported by the cursor. Need not be unique.
    pub name: String,
    /// Runtime value type reported by the cursor.
    pub source_type: TypeTag,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(ordinal: usize, name: impl Into<String>, source_type: TypeTag) -> Self {
        Self {
            ordinal,
            name: name.into(),
            source_type,
        }
    }
}

/// The ordered column metadata of one result-row shape.
///
/// Ordinals are always contiguous from zero; constructors re-index to
/// enforce this regardless of input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowSchema {
    columns: Vec<ColumnDescriptor>,
}

impl RowSchema {
    /// Build a schema from `(name, source_type)` pairs, assigning ordinals
    /// in iteration order.
    pub fn from_columns<I, N>(columns: I) -> Self
    where
        I: IntoIterator<Item = (N, TypeTag)>,
        N: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .enumerate()
                .map(|(ordinal, (name, tag))| ColumnDescriptor::new(ordinal, name, tag))
                .collect(),
        }
    }

    /// Build a schema from prepared descriptors, re-indexing ordinals.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .enumerate()
                .map(|(ordinal, mut column)| {
                    column.ordinal = ordinal;
                    column
                })
                .collect(),
        }
    }

    /// Get the columns in ordinal order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Get a column by ordinal.
    pub fn column(&self, ordinal: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(ordinal)
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get the ordered normalized column names.
    ///
    /// The signature identifies a row shape for routine caching; two queries
    /// producing the same normalized names in the same order share one
    /// compiled routine per target type.
    pub fn signature(&self, options: &MaterializeOptions) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| options.normalize(&column.name))
            .collect()
    }
}
