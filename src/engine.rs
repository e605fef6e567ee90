//! Materialization engine.
//!
//! `Materializer` is the caller-facing facade: it owns a routine cache and a
//! set of matching options, resolves cached conversion routines per
//! (type, schema) pair, and drives row cursors. Conversion itself is
//! synchronous and imposes no scheduling; the engine runs wherever the
//! caller drives it. A process-wide default instance is available through
//! `Materializer::global()`, while tests and embedded uses construct their
//! own engines with injectable lifetimes.

use crate::config::MaterializeOptions;
use crate::db::cursor::{RawRow, RowCursor};
use crate::descriptor::{Entity, registry};
use crate::error::MaterializeResult;
use crate::mapper::cache::{CacheKey, RoutineCache};
use crate::mapper::compiler::RowConverter;
use crate::mapper::{binder, compiler, matcher};
use crate::models::RowSchema;
use once_cell::sync::Lazy;
use tracing::debug;

static GLOBAL: Lazy<Materializer> = Lazy::new(Materializer::new);

/// The materialization engine.
#[derive(Debug, Default)]
pub struct Materializer {
    cache: RoutineCache,
    options: MaterializeOptions,
}

impl Materializer {
    /// Create an engine with default options.
    pub fn new() -> Self {
        Self::with_options(MaterializeOptions::default())
    }

    /// Create an engine with explicit options.
    pub fn with_options(options: MaterializeOptions) -> Self {
        Self {
            cache: RoutineCache::new(),
            options,
        }
    }

    /// Get the process-wide default engine.
    pub fn global() -> &'static Materializer {
        &GLOBAL
    }

    /// Get the engine's options.
    pub fn options(&self) -> &MaterializeOptions {
        &self.options
    }

    /// Resolve the conversion routine for a (type, schema) pair,
    /// compiling and caching it on first use.
    pub fn materialize<T: Entity>(
        &self,
        schema: &RowSchema,
    ) -> MaterializeResult<RowConverter<T>> {
        let descriptor = registry::descriptor_of::<T>()?;
        let key = CacheKey::for_schema::<T>(schema, &self.options);
        self.cache.get_or_compile(key, || {
            debug!(
                type_name = descriptor.type_name(),
                columns = schema.len(),
                "materializing new (type, schema) pair"
            );
            let matched = matcher::match_columns(schema, &descriptor, &self.options);
            let plan = binder::bind(&matched, &descriptor, &self.options)?;
            compiler::compile(plan, &descriptor, &self.options)
        })
    }

    /// Materialize every row of a cursor.
    ///
    /// Row-time errors abort the iteration and surface to the caller; the
    /// cached routine stays valid for later calls.
    pub fn materialize_all<T, C>(&self, mut cursor: C) -> MaterializeResult<Vec<T>>
    where
        T: Entity,
        C: RowCursor,
    {
        let schema = cursor.schema().clone();
        let converter = self.materialize::<T>(&schema)?;
        let mut instances = Vec::new();
        while let Some(row) = cursor.next_row() {
            instances.push(converter.convert(&row)?);
        }
        Ok(instances)
    }

    /// Drop the cached routine for a (type, schema) pair. Returns true if
    /// one was cached.
    pub fn invalidate<T: Entity>(&self, schema: &RowSchema) -> bool {
        self.cache
            .invalidate(&CacheKey::for_schema::<T>(schema, &self.options))
    }

    /// Drop every cached routine.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of cached routines.
    pub fn cached_routines(&self) -> usize {
        self.cache.len()
    }

    /// Get the number of compilations performed by this engine.
    pub fn compile_count(&self) -> u64 {
        self.cache.compile_count()
    }
}

/// Convert one raw row with a resolved routine.
pub fn convert_row<T>(converter: &RowConverter<T>, row: &dyn RawRow) -> MaterializeResult<T> {
    converter.convert(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cursor::{MemoryCursor, Row};
    use crate::descriptor::TypeDescriptor;
    use crate::models::{CellValue, TypeTag};

    #[derive(Debug, Default, PartialEq)]
    struct Widget {
        id: i64,
        label: String,
    }

    impl Entity for Widget {
        fn descriptor() -> TypeDescriptor<Self> {
            TypeDescriptor::builder("Widget")
                .default_fn(Widget::default)
                .member("id", |w: &mut Widget, v: i64| w.id = v)
                .member("label", |w: &mut Widget, v: String| w.label = v)
                .build()
        }
    }

    fn widget_schema() -> RowSchema {
        RowSchema::from_columns(vec![("id", TypeTag::Integer), ("label", TypeTag::Text)])
    }

    #[test]
    fn test_materialize_and_convert() {
        let engine = Materializer::new();
        let converter = engine.materialize::<Widget>(&widget_schema()).unwrap();
        let row = Row::new(vec![CellValue::Int(5), CellValue::Text("five".to_string())]);
        let widget = convert_row(&converter, &row).unwrap();
        assert_eq!(
            widget,
            Widget {
                id: 5,
                label: "five".to_string(),
            }
        );
    }

    #[test]
    fn test_repeat_materialization_compiles_once() {
        let engine = Materializer::new();
        engine.materialize::<Widget>(&widget_schema()).unwrap();
        engine.materialize::<Widget>(&widget_schema()).unwrap();
        assert_eq!(engine.compile_count(), 1);
        assert_eq!(engine.cached_routines(), 1);
    }

    #[test]
    fn test_distinct_shapes_get_distinct_routines() {
        let engine = Materializer::new();
        engine.materialize::<Widget>(&widget_schema()).unwrap();
        let narrow = RowSchema::from_columns(vec![("id", TypeTag::Integer)]);
        engine.materialize::<Widget>(&narrow).unwrap();
        assert_eq!(engine.cached_routines(), 2);
        assert_eq!(engine.compile_count(), 2);
    }

    #[test]
    fn test_materialize_all_drains_cursor() {
        let engine = Materializer::new();
        let cursor = MemoryCursor::new(widget_schema())
            .push_row(Row::new(vec![
                CellValue::Int(1),
                CellValue::Text("a".to_string()),
            ]))
            .push_row(Row::new(vec![
                CellValue::Int(2),
                CellValue::Text("b".to_string()),
            ]));
        let widgets: Vec<Widget> = engine.materialize_all(cursor).unwrap();
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[1].label, "b");
    }

    #[test]
    fn test_invalidate_forces_recompile() {
        let engine = Materializer::new();
        let schema = widget_schema();
        engine.materialize::<Widget>(&schema).unwrap();
        assert!(engine.invalidate::<Widget>(&schema));
        assert!(!engine.invalidate::<Widget>(&schema));
        engine.materialize::<Widget>(&schema).unwrap();
        assert_eq!(engine.compile_count(), 2);
    }

    #[test]
    fn test_global_engine_is_shared() {
        let a = Materializer::global();
        let b = Materializer::global();
        assert!(std::ptr::eq(a, b));
    }
}
