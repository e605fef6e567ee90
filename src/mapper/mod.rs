//! The result materialization pipeline.
//!
//! Leaf-first: the matcher pairs columns with slots by normalized name, the
//! binder picks a synthesis strategy and emits a binding plan, the coercer
//! chooses one conversion rule per bound column, the compiler turns the
//! finished plan into a reusable routine, and the routine cache memoizes the
//! result per (type, column-signature) pair.

pub mod binder;
pub mod cache;
pub mod coercer;
pub mod compiler;
pub mod matcher;

pub use binder::{BindingPlan, BindingStep, bind};
pub use cache::{CacheKey, RoutineCache};
pub use coercer::{CoercionRule, apply, coerce};
pub use compiler::{RowConverter, compile};
pub use matcher::{MatchEntry, MatchResult, match_columns};
