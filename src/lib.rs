//! rowbind
//!
//! A data-access toolkit that compiles tabular result rows into
//! strongly-typed Rust values. Given a row schema and a target type's
//! descriptor, the engine resolves a binding plan once, compiles it into a
//! reusable conversion routine, and memoizes the routine per
//! (type, column-signature) pair so the per-row cost stays minimal.

pub mod config;
pub mod db;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod models;
pub mod result_cache;

pub use config::{MaterializeOptions, NullPolicy};
pub use db::{MemoryCursor, RawRow, Row, RowCursor};
pub use descriptor::{
    Args, CellEnum, DeclaredType, Entity, EnumDescriptor, FromCell, ScalarKind, TypeDescriptor,
    enum_param, param,
};
pub use engine::{Materializer, convert_row};
pub use error::{MaterializeError, MaterializeResult};
pub use mapper::{BindingPlan, CacheKey, CoercionRule, RoutineCache, RowConverter};
pub use models::{CellValue, ColumnDescriptor, RowSchema, TypeTag};
pub use result_cache::ResultCache;
