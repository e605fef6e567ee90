//! Compiled routine cache.
//!
//! Routines are memoized per (target type, ordered column signature) so the
//! expensive resolution work runs once per distinct row shape rather than
//! once per row. The map supports concurrent readers and concurrent
//! first-writers with per-entry upsert; no global lock serializes unrelated
//! keys. Two racing first-time compilations are tolerated: compilation is
//! pure, the losing result is discarded, and every caller observes the
//! winner after the first successful insert. Entries never expire; explicit
//! invalidation is the only removal path.

use crate::config::MaterializeOptions;
use crate::error::{MaterializeError, MaterializeResult};
use crate::mapper::compiler::RowConverter;
use crate::models::RowSchema;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Identity of one cached routine: target type plus the ordered normalized
/// column names of the row shape. Column types are deliberately not part of
/// the key; type drift across rows of one query shape is not re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    type_id: TypeId,
    signature: Vec<String>,
}

impl CacheKey {
    /// Create a key from a prepared signature.
    pub fn new<T: 'static>(signature: Vec<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            signature,
        }
    }

    /// Create a key for a schema under the given matching options.
    pub fn for_schema<T: 'static>(schema: &RowSchema, options: &MaterializeOptions) -> Self {
        Self::new::<T>(schema.signature(options))
    }

    /// Get the normalized column signature.
    pub fn signature(&self) -> &[String] {
        &self.signature
    }
}

/// Process-shared cache of compiled conversion routines.
#[derive(Default)]
pub struct RoutineCache {
    entries: DashMap<CacheKey, Arc<dyn Any + Send + Sync>>,
    compiles: AtomicU64,
}

impl std::fmt::Debug for RoutineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineCache")
            .field("entries", &self.entries.len())
            .field("compiles", &self.compile_count())
            .finish()
    }
}

impl RoutineCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            compiles: AtomicU64::new(0),
        }
    }

    /// Look up the routine for a key, compiling and inserting on a miss.
    ///
    /// Compilation runs outside the entry lock; when two callers miss the
    /// same key concurrently, both compile and the first insert wins. A
    /// compile error is returned to the caller and nothing is cached.
    pub fn get_or_compile<T, F>(&self, key: CacheKey, compute: F) -> MaterializeResult<RowConverter<T>>
    where
        T: 'static,
        F: FnOnce() -> MaterializeResult<RowConverter<T>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            return Self::downcast::<T>(entry.value());
        }

        debug!(signature = ?key.signature(), "routine cache miss, compiling");
        let compiled = compute()?;
        self.compiles.fetch_add(1, Ordering::Relaxed);

        let erased: Arc<dyn Any + Send + Sync> = Arc::new(compiled);
        let entry = self.entries.entry(key).or_insert(erased);
        Self::downcast::<T>(entry.value())
    }

    /// Remove one routine. Returns true if an entry existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every routine.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get the number of cached routines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of compilations performed, including any discarded by
    /// a first-insert race.
    pub fn compile_count(&self) -> u64 {
        self.compiles.load(Ordering::Relaxed)
    }

    fn downcast<T: 'static>(entry: &Arc<dyn Any + Send + Sync>) -> MaterializeResult<RowConverter<T>> {
        entry
            .downcast_ref::<RowConverter<T>>()
            .cloned()
            .ok_or_else(|| {
                MaterializeError::internal("routine cache entry has an unexpected type")
            })
    }
}
