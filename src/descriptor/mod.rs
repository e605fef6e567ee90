//! Target type metadata.
//!
//! This module provides the explicit registration API for describing a
//! target type to the materialization engine:
//! - Declared types, enum metadata, and cell extraction
//! - Constructor and member slots with custom converters
//! - A process-wide descriptor registry with explicit invalidation

pub mod registry;
pub mod ty;

pub use ty::{
    Args, CellEnum, ConstructorSpec, Converter, DeclaredType, Entity, EnumDescriptor, Factory,
    FromCell, MemberSlot, ParamSpec, PostHook, ScalarKind, Setter, TypeDescriptor,
    TypeDescriptorBuilder, enum_param, param,
};
