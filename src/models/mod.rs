//! Data models.
//!
//! This module defines the value and schema types shared by the
//! materialization pipeline:
//! - Raw cell values and type tags
//! - Row schema descriptors

pub mod schema;
pub mod value;

pub use schema::{ColumnDescriptor, RowSchema};
pub use value::{CellValue, TypeTag};
