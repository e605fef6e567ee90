//! Process-wide type descriptor registry.
//!
//! Descriptors are built once per target type and shared for the process
//! lifetime. The only mutation after construction is explicit invalidation,
//! used when a type's metadata is redefined (test fixtures, hot reload).

use crate::descriptor::{Entity, TypeDescriptor};
use crate::error::{MaterializeError, MaterializeResult};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

static DESCRIPTORS: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);

/// Get the cached descriptor for a type, building it on first use.
pub fn descriptor_of<T: Entity>() -> MaterializeResult<Arc<TypeDescriptor<T>>> {
    let type_id = TypeId::of::<T>();
    if let Some(entry) = DESCRIPTORS.get(&type_id) {
        return downcast::<T>(entry.value().clone());
    }

    let built: Arc<TypeDescriptor<T>> = Arc::new(T::descriptor());
    debug!(type_name = built.type_name(), "built type descriptor");
    let erased: Arc<dyn Any + Send + Sync> = built;
    let entry = DESCRIPTORS.entry(type_id).or_insert(erased);
    downcast::<T>(entry.value().clone())
}

/// Drop the cached descriptor for a type. Returns true if one was cached.
pub fn invalidate<T: 'static>() -> bool {
    DESCRIPTORS.remove(&TypeId::of::<T>()).is_some()
}

/// Drop every cached descriptor.
pub fn clear() {
    DESCRIPTORS.clear();
}

/// Get the number of cached descriptors.
pub fn len() -> usize {
    DESCRIPTORS.len()
}

fn downcast<T: Entity>(
    erased: Arc<dyn Any + Send + Sync>,
) -> MaterializeResult<Arc<TypeDescriptor<T>>> {
    erased.downcast::<TypeDescriptor<T>>().map_err(|_| {
        MaterializeError::internal("descriptor registry entry has an unexpected type")
    })
}
