//! Row access layer.
//!
//! This module provides the cursor interfaces the engine consumes and the
//! adapter bridging `sqlx` SQLite result rows into them:
//! - Raw row and forward-only cursor traits
//! - In-memory cursor implementation
//! - SQLite row decoding by type category

pub mod cursor;
pub mod sqlite;

pub use cursor::{MemoryCursor, RawRow, Row, RowCursor};
