//! Type descriptors.
//!
//! A `TypeDescriptor` captures everything the binder needs to know about a
//! target type: its constructors ranked by parameter count, its settable
//! members with their declared types, per-member custom converters, and an
//! optional post-materialization hook. Descriptors are built through an
//! explicit registration API (the `Entity` trait) rather than runtime
//! reflection, and cached process-wide by the registry.

use crate::error::{MaterializeError, MaterializeResult};
use crate::models::{CellValue, TypeTag};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Custom value transformation attached to a member. Takes precedence over
/// the built-in coercion matrix and receives raw cell values, nulls included.
pub type Converter = Arc<dyn Fn(CellValue) -> MaterializeResult<CellValue> + Send + Sync>;

/// Assigns one coerced value to a member of an existing instance.
pub type Setter<T> = Arc<dyn Fn(&mut T, CellValue) -> MaterializeResult<()> + Send + Sync>;

/// Builds an instance from coerced constructor arguments.
pub type Factory<T> = Arc<dyn Fn(Args) -> MaterializeResult<T> + Send + Sync>;

/// Transforms a fully constructed instance before it is returned.
pub type PostHook<T> = Arc<dyn Fn(T) -> MaterializeResult<T> + Send + Sync>;

/// Scalar kind of a declared member or parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Text,
    Bytes,
    Timestamp,
    Uuid,
    Enum,
}

impl ScalarKind {
    /// Get the kind name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
            Self::Enum => "enum",
        }
    }

    /// Check if the kind is an integer kind.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
        )
    }

    /// Check if the kind is a floating point kind.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Get the type tag a value of this kind is carried under.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Bool => TypeTag::Bool,
            Self::F32 | Self::F64 => TypeTag::Float,
            Self::Text => TypeTag::Text,
            Self::Bytes => TypeTag::Bytes,
            Self::Timestamp => TypeTag::Timestamp,
            Self::Uuid => TypeTag::Uuid,
            // Integers and enum discriminants are carried as integer cells.
            _ => TypeTag::Integer,
        }
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Metadata for an enum target: variant names and their discriminants.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<(String, i64)>,
}

impl EnumDescriptor {
    /// Create a new enum descriptor.
    pub fn new(name: impl Into<String>, variants: Vec<(String, i64)>) -> Self {
        Self {
            name: name.into(),
            variants,
        }
    }

    /// Build the descriptor for a `CellEnum` implementation.
    pub fn of<E: CellEnum>() -> Arc<Self> {
        Arc::new(Self::new(
            E::enum_name(),
            E::variants()
                .iter()
                .map(|(name, discriminant)| ((*name).to_string(), *discriminant))
                .collect(),
        ))
    }

    /// Look up a variant discriminant by name, case-insensitively.
    pub fn discriminant_of(&self, name: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|(variant, _)| variant.eq_ignore_ascii_case(name))
            .map(|(_, discriminant)| *discriminant)
    }

    /// Check whether a discriminant belongs to the enum.
    pub fn contains(&self, discriminant: i64) -> bool {
        self.variants.iter().any(|(_, d)| *d == discriminant)
    }

    /// Get the first declared variant's discriminant, used as the enum's
    /// zero value.
    pub fn first_discriminant(&self) -> Option<i64> {
        self.variants.first().map(|(_, d)| *d)
    }
}

/// An enum type that can be populated from a row cell by variant name or
/// discriminant.
pub trait CellEnum: Sized + 'static {
    /// The enum's name for error messages.
    fn enum_name() -> &'static str;
    /// Variant names and discriminants, in declaration order.
    fn variants() -> &'static [(&'static str, i64)];
    /// Construct the variant for a discriminant.
    fn from_discriminant(discriminant: i64) -> Option<Self>;
}

/// The declared type of a member or constructor parameter.
#[derive(Debug, Clone)]
pub struct DeclaredType {
    pub kind: ScalarKind,
    pub nullable: bool,
    pub enumeration: Option<Arc<EnumDescriptor>>,
}

impl DeclaredType {
    /// Create a non-nullable scalar declared type.
    pub fn scalar(kind: ScalarKind) -> Self {
        debug_assert!(kind != ScalarKind::Enum, "use DeclaredType::enumeration");
        Self {
            kind,
            nullable: false,
            enumeration: None,
        }
    }

    /// Create a non-nullable enum declared type.
    pub fn enumeration(descriptor: Arc<EnumDescriptor>) -> Self {
        Self {
            kind: ScalarKind::Enum,
            nullable: false,
            enumeration: Some(descriptor),
        }
    }

    /// Mark the declared type nullable.
    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Get the declared type name for error messages.
    pub fn name(&self) -> String {
        let base = match (&self.kind, &self.enumeration) {
            (ScalarKind::Enum, Some(e)) => format!("enum {}", e.name),
            _ => self.kind.name().to_string(),
        };
        if self.nullable {
            format!("nullable {}", base)
        } else {
            base
        }
    }

    /// Get the zero value substituted for nulls under the zero-value policy.
    pub fn zero_value(&self) -> CellValue {
        match self.kind {
            ScalarKind::Bool => CellValue::Bool(false),
            ScalarKind::F32 | ScalarKind::F64 => CellValue::Float(0.0),
            ScalarKind::Text => CellValue::Text(String::new()),
            ScalarKind::Bytes => CellValue::Bytes(Vec::new()),
            ScalarKind::Timestamp => CellValue::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
            ScalarKind::Uuid => CellValue::Uuid(Uuid::nil()),
            ScalarKind::Enum => CellValue::Int(
                self.enumeration
                    .as_ref()
                    .and_then(|e| e.first_discriminant())
                    .unwrap_or(0),
            ),
            _ => CellValue::Int(0),
        }
    }
}

/// A value that can be extracted from a coerced row cell.
///
/// Implementations exist for the scalar types a member can declare; the
/// `Option<T>` implementation marks the declared type nullable.
pub trait FromCell: Sized + 'static {
    /// The declared type this Rust type corresponds to.
    fn declared() -> DeclaredType;
    /// Extract the value from a coerced cell.
    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self>;
}

macro_rules! impl_from_cell_int {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromCell for $ty {
                fn declared() -> DeclaredType {
                    DeclaredType::scalar(ScalarKind::$kind)
                }

                fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
                    match cell {
                        CellValue::Int(v) => <$ty>::try_from(v).map_err(|_| {
                            MaterializeError::overflow(
                                column,
                                v.to_string(),
                                ScalarKind::$kind.name(),
                            )
                        }),
                        other => Err(MaterializeError::invalid_value(
                            column,
                            format!(
                                "expected an integer cell for {}, got {}",
                                ScalarKind::$kind.name(),
                                other.type_name()
                            ),
                        )),
                    }
                }
            }
        )*
    };
}

impl_from_cell_int!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

impl FromCell for bool {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::Bool)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Bool(v) => Ok(v),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a bool cell, got {}", other.type_name()),
            )),
        }
    }
}

impl FromCell for f32 {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::F32)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Float(v) => Ok(v as f32),
            CellValue::Int(v) => Ok(v as f32),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a float cell, got {}", other.type_name()),
            )),
        }
    }
}

impl FromCell for f64 {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::F64)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Float(v) => Ok(v),
            CellValue::Int(v) => Ok(v as f64),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a float cell, got {}", other.type_name()),
            )),
        }
    }
}

impl FromCell for String {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::Text)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Text(v) => Ok(v),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a text cell, got {}", other.type_name()),
            )),
        }
    }
}

impl FromCell for Vec<u8> {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::Bytes)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Bytes(v) => Ok(v),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a bytes cell, got {}", other.type_name()),
            )),
        }
    }
}

impl FromCell for DateTime<Utc> {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::Timestamp)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Timestamp(v) => Ok(v),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a timestamp cell, got {}", other.type_name()),
            )),
        }
    }
}

impl FromCell for Uuid {
    fn declared() -> DeclaredType {
        DeclaredType::scalar(ScalarKind::Uuid)
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        match cell {
            CellValue::Uuid(v) => Ok(v),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("expected a uuid cell, got {}", other.type_name()),
            )),
        }
    }
}

impl<C: FromCell> FromCell for Option<C> {
    fn declared() -> DeclaredType {
        C::declared().into_nullable()
    }

    fn from_cell(cell: CellValue, column: &str) -> MaterializeResult<Self> {
        if cell.is_null() {
            Ok(None)
        } else {
            C::from_cell(cell, column).map(Some)
        }
    }
}

/// Coerced constructor arguments, consumed in declared parameter order.
pub struct Args {
    values: std::vec::IntoIter<(String, CellValue)>,
}

impl Args {
    pub(crate) fn new(values: Vec<(String, CellValue)>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Take the next argument as a scalar value.
    pub fn take<C: FromCell>(&mut self) -> MaterializeResult<C> {
        let (column, cell) = self.next_value()?;
        C::from_cell(cell, &column)
    }

    /// Take the next argument as an enum populated from its discriminant.
    pub fn take_enum<E: CellEnum>(&mut self) -> MaterializeResult<E> {
        let (column, cell) = self.next_value()?;
        match cell {
            CellValue::Int(d) => E::from_discriminant(d).ok_or_else(|| {
                MaterializeError::invalid_value(
                    &column,
                    format!("{} is not a discriminant of enum {}", d, E::enum_name()),
                )
            }),
            other => Err(MaterializeError::invalid_value(
                &column,
                format!(
                    "expected an enum discriminant cell, got {}",
                    other.type_name()
                ),
            )),
        }
    }

    /// Get the number of arguments not yet taken.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn next_value(&mut self) -> MaterializeResult<(String, CellValue)> {
        self.values.next().ok_or_else(|| {
            MaterializeError::internal("constructor consumed more arguments than the plan supplied")
        })
    }
}

/// A constructor parameter: name and declared type.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub declared: DeclaredType,
}

/// Create a constructor parameter spec for a scalar type.
pub fn param<C: FromCell>(name: impl Into<String>) -> ParamSpec {
    ParamSpec {
        name: name.into(),
        declared: C::declared(),
    }
}

/// Create a constructor parameter spec for an enum type.
pub fn enum_param<E: CellEnum>(name: impl Into<String>) -> ParamSpec {
    ParamSpec {
        name: name.into(),
        declared: DeclaredType::enumeration(EnumDescriptor::of::<E>()),
    }
}

/// One constructor signature of a target type.
pub struct ConstructorSpec<T> {
    params: Vec<ParamSpec>,
    factory: Factory<T>,
}

impl<T> ConstructorSpec<T> {
    /// Get the parameters in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Get the parameter count.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn invoke(&self, args: Args) -> MaterializeResult<T> {
        (self.factory)(args)
    }
}

impl<T> std::fmt::Debug for ConstructorSpec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorSpec")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One settable (or declared read-only) member of a target type.
pub struct MemberSlot<T> {
    name: String,
    declared: DeclaredType,
    setter: Option<Setter<T>>,
    converter: Option<Converter>,
}

impl<T> MemberSlot<T> {
    /// Get the member's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the member's declared type.
    pub fn declared(&self) -> &DeclaredType {
        &self.declared
    }

    /// Get the member's custom converter, if any.
    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    /// Check if the member can be assigned after construction.
    pub fn assignable(&self) -> bool {
        self.setter.is_some()
    }

    pub(crate) fn set(&self, target: &mut T, value: CellValue) -> MaterializeResult<()> {
        match &self.setter {
            Some(setter) => setter(target, value),
            None => Err(MaterializeError::internal(format!(
                "member '{}' is not assignable",
                self.name
            ))),
        }
    }
}

impl<T> std::fmt::Debug for MemberSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberSlot")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("assignable", &self.assignable())
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}

/// Metadata of a target type: constructors ranked by parameter count,
/// settable members, and hooks.
pub struct TypeDescriptor<T> {
    type_name: String,
    constructors: Vec<ConstructorSpec<T>>,
    default_ctor: Option<Arc<dyn Fn() -> T + Send + Sync>>,
    members: Vec<Arc<MemberSlot<T>>>,
    post_hook: Option<PostHook<T>>,
}

impl<T: 'static> TypeDescriptor<T> {
    /// Start building a descriptor.
    pub fn builder(type_name: impl Into<String>) -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder {
            type_name: type_name.into(),
            constructors: Vec::new(),
            default_ctor: None,
            members: Vec::new(),
            post_hook: None,
        }
    }

    /// Get the target type's name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Get the constructors, ranked by parameter count descending
    /// (declaration order breaks ties).
    pub fn constructors(&self) -> &[ConstructorSpec<T>] {
        &self.constructors
    }

    /// Get a constructor by rank index.
    pub fn constructor(&self, index: usize) -> Option<&ConstructorSpec<T>> {
        self.constructors.get(index)
    }

    /// Check if the type can be default-constructed.
    pub fn default_constructible(&self) -> bool {
        self.default_ctor.is_some()
    }

    /// Get the members in declaration order.
    pub fn members(&self) -> &[Arc<MemberSlot<T>>] {
        &self.members
    }

    /// Get a member by index.
    pub fn member(&self, index: usize) -> Option<&Arc<MemberSlot<T>>> {
        self.members.get(index)
    }

    /// Get the post-materialization hook, if any.
    pub fn post_hook(&self) -> Option<&PostHook<T>> {
        self.post_hook.as_ref()
    }

    pub(crate) fn default_instance(&self) -> MaterializeResult<T> {
        match &self.default_ctor {
            Some(ctor) => Ok(ctor()),
            None => Err(MaterializeError::internal(format!(
                "type '{}' has no default constructor",
                self.type_name
            ))),
        }
    }
}

impl<T> std::fmt::Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("constructors", &self.constructors.len())
            .field("members", &self.members)
            .field("default_constructible", &self.default_ctor.is_some())
            .finish()
    }
}

/// Builder for `TypeDescriptor`.
pub struct TypeDescriptorBuilder<T> {
    type_name: String,
    constructors: Vec<ConstructorSpec<T>>,
    default_ctor: Option<Arc<dyn Fn() -> T + Send + Sync>>,
    members: Vec<MemberSlot<T>>,
    post_hook: Option<PostHook<T>>,
}

impl<T: 'static> TypeDescriptorBuilder<T> {
    /// Register the default constructor.
    pub fn default_fn(mut self, ctor: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.default_ctor = Some(Arc::new(ctor));
        self
    }

    /// Register a parameterized constructor. Parameters are matched to
    /// columns by name; the factory receives coerced arguments in the
    /// declared order.
    pub fn constructor(
        mut self,
        params: Vec<ParamSpec>,
        factory: impl Fn(Args) -> MaterializeResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.push(ConstructorSpec {
            params,
            factory: Arc::new(factory),
        });
        self
    }

    /// Register an assignable member of a scalar type.
    pub fn member<C: FromCell>(
        mut self,
        name: impl Into<String>,
        set: impl Fn(&mut T, C) + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let member_name = name.clone();
        self.members.push(MemberSlot {
            name,
            declared: C::declared(),
            setter: Some(Arc::new(move |target, cell| {
                set(target, C::from_cell(cell, &member_name)?);
                Ok(())
            })),
            converter: None,
        });
        self
    }

    /// Register an assignable member of an enum type.
    pub fn enum_member<E: CellEnum>(
        mut self,
        name: impl Into<String>,
        set: impl Fn(&mut T, E) + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let member_name = name.clone();
        self.members.push(MemberSlot {
            name,
            declared: DeclaredType::enumeration(EnumDescriptor::of::<E>()),
            setter: Some(Arc::new(move |target, cell| match cell {
                CellValue::Int(d) => {
                    let value = E::from_discriminant(d).ok_or_else(|| {
                        MaterializeError::invalid_value(
                            &member_name,
                            format!("{} is not a discriminant of enum {}", d, E::enum_name()),
                        )
                    })?;
                    set(target, value);
                    Ok(())
                }
                other => Err(MaterializeError::invalid_value(
                    &member_name,
                    format!(
                        "expected an enum discriminant cell, got {}",
                        other.type_name()
                    ),
                )),
            })),
            converter: None,
        });
        self
    }

    /// Register a read-only member. It participates in name matching but is
    /// never assigned; columns matching only read-only members are unused.
    pub fn readonly<C: FromCell>(mut self, name: impl Into<String>) -> Self {
        self.members.push(MemberSlot {
            name: name.into(),
            declared: C::declared(),
            setter: None,
            converter: None,
        });
        self
    }

    /// Attach a custom converter to a previously registered member. The
    /// converter replaces the built-in coercion matrix for that member.
    pub fn with_converter(
        mut self,
        member: &str,
        converter: impl Fn(CellValue) -> MaterializeResult<CellValue> + Send + Sync + 'static,
    ) -> Self {
        match self
            .members
            .iter_mut()
            .find(|slot| slot.name.eq_ignore_ascii_case(member))
        {
            Some(slot) => slot.converter = Some(Arc::new(converter)),
            None => warn!(
                type_name = %self.type_name,
                member,
                "converter attached to unknown member; ignored"
            ),
        }
        self
    }

    /// Register a hook that runs on every fully constructed instance.
    pub fn after_load(mut self, hook: impl Fn(T) -> MaterializeResult<T> + Send + Sync + 'static) -> Self {
        self.post_hook = Some(Arc::new(hook));
        self
    }

    /// Finish the descriptor. Constructors are ranked by parameter count
    /// descending; the sort is stable, so declaration order breaks ties.
    pub fn build(mut self) -> TypeDescriptor<T> {
        self.constructors
            .sort_by(|a, b| b.params.len().cmp(&a.params.len()));
        TypeDescriptor {
            type_name: self.type_name,
            constructors: self.constructors,
            default_ctor: self.default_ctor,
            members: self.members.into_iter().map(Arc::new).collect(),
            post_hook: self.post_hook,
        }
    }
}

/// A type that can be materialized from result rows.
///
/// Implementations describe the type once; the registry caches the built
/// descriptor for the process lifetime.
pub trait Entity: Sized + 'static {
    /// Build the type's descriptor.
    fn descriptor() -> TypeDescriptor<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        id: i64,
        name: String,
        score: Option<f64>,
    }

    #[derive(Debug, PartialEq)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    impl CellEnum for Color {
        fn enum_name() -> &'static str {
            "Color"
        }

        fn variants() -> &'static [(&'static str, i64)] {
            &[("Red", 0), ("Green", 1), ("Blue", 2)]
        }

        fn from_discriminant(discriminant: i64) -> Option<Self> {
            match discriminant {
                0 => Some(Self::Red),
                1 => Some(Self::Green),
                2 => Some(Self::Blue),
                _ => None,
            }
        }
    }

    fn sample_descriptor() -> TypeDescriptor<Sample> {
        TypeDescriptor::builder("Sample")
            .default_fn(Sample::default)
            .constructor(
                vec![param::<i64>("id"), param::<String>("name")],
                |mut args| {
                    Ok(Sample {
                        id: args.take()?,
                        name: args.take()?,
                        score: None,
                    })
                },
            )
            .member("id", |s: &mut Sample, v: i64| s.id = v)
            .member("name", |s: &mut Sample, v: String| s.name = v)
            .member("score", |s: &mut Sample, v: Option<f64>| s.score = v)
            .build()
    }

    #[test]
    fn test_builder_ranks_constructors_by_arity() {
        let descriptor = TypeDescriptor::<Sample>::builder("Sample")
            .constructor(vec![param::<i64>("id")], |mut args| {
                Ok(Sample {
                    id: args.take()?,
                    ..Sample::default()
                })
            })
            .constructor(
                vec![param::<i64>("id"), param::<String>("name")],
                |mut args| {
                    Ok(Sample {
                        id: args.take()?,
                        name: args.take()?,
                        score: None,
                    })
                },
            )
            .build();
        assert_eq!(descriptor.constructors()[0].arity(), 2);
        assert_eq!(descriptor.constructors()[1].arity(), 1);
    }

    #[test]
    fn test_members_and_assignability() {
        let descriptor = sample_descriptor();
        assert_eq!(descriptor.members().len(), 3);
        assert!(descriptor.members().iter().all(|m| m.assignable()));
        assert!(descriptor.default_constructible());

        let readonly = TypeDescriptor::<Sample>::builder("Sample")
            .readonly::<i64>("version")
            .build();
        assert!(!readonly.member(0).unwrap().assignable());
    }

    #[test]
    fn test_member_setter_applies_value() {
        let descriptor = sample_descriptor();
        let mut sample = Sample::default();
        let slot = descriptor
            .members()
            .iter()
            .find(|m| m.name() == "name")
            .unwrap();
        slot.set(&mut sample, CellValue::Text("alice".to_string()))
            .unwrap();
        assert_eq!(sample.name, "alice");
    }

    #[test]
    fn test_nullable_member_declared_type() {
        let descriptor = sample_descriptor();
        let slot = descriptor
            .members()
            .iter()
            .find(|m| m.name() == "score")
            .unwrap();
        assert!(slot.declared().nullable);
        assert_eq!(slot.declared().kind, ScalarKind::F64);
    }

    #[test]
    fn test_from_cell_int_overflow() {
        let err = i16::from_cell(CellValue::Int(70000), "count").unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::ConversionOverflow { .. }
        ));
    }

    #[test]
    fn test_from_cell_option_null() {
        let value: Option<f64> = Option::<f64>::from_cell(CellValue::Null, "score").unwrap();
        assert!(value.is_none());
        let value = Option::<f64>::from_cell(CellValue::Float(1.5), "score").unwrap();
        assert_eq!(value, Some(1.5));
    }

    #[test]
    fn test_args_take_in_order() {
        let mut args = Args::new(vec![
            ("id".to_string(), CellValue::Int(9)),
            ("name".to_string(), CellValue::Text("bob".to_string())),
        ]);
        assert_eq!(args.remaining(), 2);
        let id: i64 = args.take().unwrap();
        let name: String = args.take().unwrap();
        assert_eq!(id, 9);
        assert_eq!(name, "bob");
        assert!(args.take::<i64>().is_err());
    }

    #[test]
    fn test_args_take_enum() {
        let mut args = Args::new(vec![("color".to_string(), CellValue::Int(2))]);
        let color: Color = args.take_enum().unwrap();
        assert_eq!(color, Color::Blue);

        let mut bad = Args::new(vec![("color".to_string(), CellValue::Int(9))]);
        assert!(bad.take_enum::<Color>().is_err());
    }

    #[test]
    fn test_enum_descriptor_lookup() {
        let descriptor = EnumDescriptor::of::<Color>();
        assert_eq!(descriptor.discriminant_of("green"), Some(1));
        assert_eq!(descriptor.discriminant_of("GREEN"), Some(1));
        assert_eq!(descriptor.discriminant_of("magenta"), None);
        assert!(descriptor.contains(2));
        assert!(!descriptor.contains(7));
        assert_eq!(descriptor.first_discriminant(), Some(0));
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(
            DeclaredType::scalar(ScalarKind::I32).zero_value(),
            CellValue::Int(0)
        );
        assert_eq!(
            DeclaredType::scalar(ScalarKind::Text).zero_value(),
            CellValue::Text(String::new())
        );
        assert_eq!(
            DeclaredType::scalar(ScalarKind::Uuid).zero_value(),
            CellValue::Uuid(Uuid::nil())
        );
        assert_eq!(
            DeclaredType::enumeration(EnumDescriptor::of::<Color>()).zero_value(),
            CellValue::Int(0)
        );
    }

    #[test]
    fn test_declared_type_names() {
        assert_eq!(DeclaredType::scalar(ScalarKind::I32).name(), "i32");
        assert_eq!(
            DeclaredType::scalar(ScalarKind::I32).into_nullable().name(),
            "nullable i32"
        );
        assert_eq!(
            DeclaredType::enumeration(EnumDescriptor::of::<Color>()).name(),
            "enum Color"
        );
    }

    #[test]
    fn test_with_converter_attaches_by_name() {
        let descriptor = TypeDescriptor::<Sample>::builder("Sample")
            .member("name", |s: &mut Sample, v: String| s.name = v)
            .with_converter("Name", |cell| Ok(cell))
            .build();
        assert!(descriptor.member(0).unwrap().converter().is_some());
    }
}
