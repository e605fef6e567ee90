//! Value coercion.
//!
//! Rule selection runs once at bind time: `coerce` is a pure, total function
//! over the supported type matrix and fails eagerly with an
//! unsupported-conversion error so a bad schema/type pairing is rejected
//! before any rows are processed. Rule application runs per row and is where
//! the input-dependent failures live: null into a non-nullable target,
//! numeric overflow, unparseable text.

use crate::config::NullPolicy;
use crate::descriptor::{Converter, DeclaredType, EnumDescriptor, ScalarKind};
use crate::error::{MaterializeError, MaterializeResult};
use crate::models::{CellValue, TypeTag};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// The conversion chosen for one column/target pair.
///
/// Every built-in rule is wrapped in `NullableWrap` or `NullableUnwrap`
/// according to the target's declared nullability; a custom converter is
/// never wrapped and receives raw cells, nulls included.
#[derive(Clone)]
pub enum CoercionRule {
    /// Source value already has the target's shape.
    Identity,
    /// Numeric widening/narrowing with overflow checks.
    NumericConvert(ScalarKind),
    /// Lexical conversion: text parses into the target kind, non-text
    /// formats into text.
    Parse(ScalarKind),
    /// Enum resolution by variant name or discriminant.
    EnumLookup(Arc<EnumDescriptor>),
    /// Target is nullable: nulls pass through, other values use the inner
    /// rule.
    NullableWrap(Box<CoercionRule>),
    /// Target is non-nullable: nulls follow the configured null policy,
    /// other values use the inner rule.
    NullableUnwrap(Box<CoercionRule>),
    /// Member-declared converter; replaces the built-in matrix.
    CustomConvert(Converter),
}

impl std::fmt::Debug for CoercionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::NumericConvert(kind) => write!(f, "NumericConvert({})", kind),
            Self::Parse(kind) => write!(f, "Parse({})", kind),
            Self::EnumLookup(e) => write!(f, "EnumLookup({})", e.name),
            Self::NullableWrap(inner) => f.debug_tuple("NullableWrap").field(inner).finish(),
            Self::NullableUnwrap(inner) => f.debug_tuple("NullableUnwrap").field(inner).finish(),
            Self::CustomConvert(_) => write!(f, "CustomConvert"),
        }
    }
}

/// Choose the coercion rule for one column/target pair.
///
/// A custom converter always takes precedence over the built-in matrix.
/// Fails with `UnsupportedConversion` when no rule exists.
pub fn coerce(
    source: TypeTag,
    target: &DeclaredType,
    converter: Option<&Converter>,
    column: &str,
) -> MaterializeResult<CoercionRule> {
    if let Some(converter) = converter {
        return Ok(CoercionRule::CustomConvert(converter.clone()));
    }
    let base = base_rule(source, target, column)?;
    Ok(if target.nullable {
        CoercionRule::NullableWrap(Box::new(base))
    } else {
        CoercionRule::NullableUnwrap(Box::new(base))
    })
}

fn base_rule(
    source: TypeTag,
    target: &DeclaredType,
    column: &str,
) -> MaterializeResult<CoercionRule> {
    if target.kind == ScalarKind::Enum {
        let enumeration = target.enumeration.clone().ok_or_else(|| {
            MaterializeError::internal(format!(
                "enum target for column '{}' has no enum descriptor",
                column
            ))
        })?;
        return match source {
            TypeTag::Integer | TypeTag::Text | TypeTag::Unknown => {
                Ok(CoercionRule::EnumLookup(enumeration))
            }
            _ => Err(MaterializeError::unsupported_conversion(
                column,
                source.name(),
                target.name(),
            )),
        };
    }

    let kind = target.kind;
    let rule = match (source, kind) {
        // Exact matches.
        (TypeTag::Bool, ScalarKind::Bool) => CoercionRule::Identity,
        (TypeTag::Integer, ScalarKind::I64) => CoercionRule::Identity,
        (TypeTag::Float, ScalarKind::F64) => CoercionRule::Identity,
        (TypeTag::Text, ScalarKind::Text) => CoercionRule::Identity,
        (TypeTag::Bytes, ScalarKind::Bytes) => CoercionRule::Identity,
        (TypeTag::Timestamp, ScalarKind::Timestamp) => CoercionRule::Identity,
        (TypeTag::Uuid, ScalarKind::Uuid) => CoercionRule::Identity,

        // Numeric family, including bool endpoints.
        (TypeTag::Integer, k) if k.is_integer() || k.is_float() || k == ScalarKind::Bool => {
            CoercionRule::NumericConvert(k)
        }
        (TypeTag::Float, k) if k.is_integer() || k.is_float() => CoercionRule::NumericConvert(k),
        (TypeTag::Bool, k) if k.is_integer() || k.is_float() => CoercionRule::NumericConvert(k),

        // Anything with a textual form converts to text.
        (
            TypeTag::Integer
            | TypeTag::Float
            | TypeTag::Bool
            | TypeTag::Timestamp
            | TypeTag::Uuid
            | TypeTag::Bytes,
            ScalarKind::Text,
        ) => CoercionRule::Parse(ScalarKind::Text),

        // Text parses into any parseable kind.
        (TypeTag::Text, k) => CoercionRule::Parse(k),

        // Unclassified columns fall back to lexical conversion.
        (TypeTag::Unknown, k) => CoercionRule::Parse(k),

        _ => {
            return Err(MaterializeError::unsupported_conversion(
                column,
                source.name(),
                target.name(),
            ));
        }
    };
    Ok(rule)
}

/// Apply a coercion rule to one raw cell.
pub fn apply(
    rule: &CoercionRule,
    cell: CellValue,
    column: &str,
    target: &DeclaredType,
    policy: NullPolicy,
) -> MaterializeResult<CellValue> {
    match rule {
        CoercionRule::NullableWrap(inner) => {
            if cell.is_null() {
                Ok(CellValue::Null)
            } else {
                apply(inner, cell, column, target, policy)
            }
        }
        CoercionRule::NullableUnwrap(inner) => {
            if cell.is_null() {
                match policy {
                    NullPolicy::ZeroValue => Ok(target.zero_value()),
                    NullPolicy::ErrorOnNull => {
                        Err(MaterializeError::null_coercion(column, target.name()))
                    }
                }
            } else {
                apply(inner, cell, column, target, policy)
            }
        }
        CoercionRule::Identity => Ok(cell),
        CoercionRule::NumericConvert(kind) => numeric_convert(cell, *kind, column),
        CoercionRule::Parse(kind) => lexical_convert(cell, *kind, column),
        CoercionRule::EnumLookup(enumeration) => enum_lookup(cell, enumeration, column),
        CoercionRule::CustomConvert(converter) => converter(cell),
    }
}

/// Inclusive i64 bounds of an integer kind. `u64` is capped at `i64::MAX`
/// because raw cells carry integers as `i64`.
fn int_bounds(kind: ScalarKind) -> Option<(i64, i64)> {
    match kind {
        ScalarKind::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
        ScalarKind::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
        ScalarKind::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
        ScalarKind::I64 => Some((i64::MIN, i64::MAX)),
        ScalarKind::U8 => Some((0, u8::MAX as i64)),
        ScalarKind::U16 => Some((0, u16::MAX as i64)),
        ScalarKind::U32 => Some((0, u32::MAX as i64)),
        ScalarKind::U64 => Some((0, i64::MAX)),
        _ => None,
    }
}

fn numeric_convert(cell: CellValue, kind: ScalarKind, column: &str) -> MaterializeResult<CellValue> {
    match cell {
        CellValue::Int(v) => {
            if kind.is_float() {
                return Ok(CellValue::Float(v as f64));
            }
            if kind == ScalarKind::Bool {
                return Ok(CellValue::Bool(v != 0));
            }
            match int_bounds(kind) {
                Some((min, max)) if v >= min && v <= max => Ok(CellValue::Int(v)),
                Some(_) => Err(MaterializeError::overflow(
                    column,
                    v.to_string(),
                    kind.name(),
                )),
                None => Err(MaterializeError::internal(format!(
                    "numeric conversion to non-numeric kind {}",
                    kind.name()
                ))),
            }
        }
        CellValue::Float(v) => {
            if kind == ScalarKind::F64 {
                return Ok(CellValue::Float(v));
            }
            if kind == ScalarKind::F32 {
                return if v.is_finite() && (v as f32).is_infinite() {
                    Err(MaterializeError::overflow(
                        column,
                        v.to_string(),
                        kind.name(),
                    ))
                } else {
                    Ok(CellValue::Float(v))
                };
            }
            // Round to nearest before the range check, matching the
            // convert-then-truncate behavior callers expect from numeric
            // result columns.
            let rounded = v.round();
            match int_bounds(kind) {
                Some((min, max))
                    if rounded.is_finite()
                        && rounded >= min as f64
                        && rounded <= max as f64 =>
                {
                    Ok(CellValue::Int(rounded as i64))
                }
                Some(_) => Err(MaterializeError::overflow(
                    column,
                    v.to_string(),
                    kind.name(),
                )),
                None => Err(MaterializeError::internal(format!(
                    "numeric conversion to non-numeric kind {}",
                    kind.name()
                ))),
            }
        }
        CellValue::Bool(b) => {
            if kind.is_float() {
                Ok(CellValue::Float(if b { 1.0 } else { 0.0 }))
            } else if kind.is_integer() {
                Ok(CellValue::Int(b as i64))
            } else if kind == ScalarKind::Bool {
                Ok(CellValue::Bool(b))
            } else {
                Err(MaterializeError::invalid_value(
                    column,
                    format!("cannot numerically convert bool to {}", kind.name()),
                ))
            }
        }
        other => Err(MaterializeError::invalid_value(
            column,
            format!(
                "cannot numerically convert {} to {}",
                other.type_name(),
                kind.name()
            ),
        )),
    }
}

fn lexical_convert(cell: CellValue, kind: ScalarKind, column: &str) -> MaterializeResult<CellValue> {
    // Unclassified columns may already carry a value of the target family:
    // numeric targets accept any numeric cell, other targets accept their
    // own shape directly.
    if (kind.is_integer() || kind.is_float())
        && matches!(
            cell,
            CellValue::Int(_) | CellValue::Float(_) | CellValue::Bool(_)
        )
    {
        return numeric_convert(cell, kind, column);
    }
    if let Some(tag) = cell.tag() {
        if tag == kind.tag() && !kind.is_integer() && !kind.is_float() {
            return Ok(cell);
        }
    }

    match (cell, kind) {
        (CellValue::Text(s), ScalarKind::Bool) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(CellValue::Bool(true)),
            "false" | "f" | "0" => Ok(CellValue::Bool(false)),
            other => Err(MaterializeError::invalid_value(
                column,
                format!("'{}' is not a boolean", other),
            )),
        },
        (CellValue::Text(s), k) if k.is_integer() => {
            let parsed: i64 = s.trim().parse().map_err(|_| {
                MaterializeError::invalid_value(
                    column,
                    format!("'{}' is not an integer", s.trim()),
                )
            })?;
            numeric_convert(CellValue::Int(parsed), k, column)
        }
        (CellValue::Text(s), k) if k.is_float() => {
            let parsed: f64 = s.trim().parse().map_err(|_| {
                MaterializeError::invalid_value(column, format!("'{}' is not a number", s.trim()))
            })?;
            numeric_convert(CellValue::Float(parsed), k, column)
        }
        (CellValue::Text(s), ScalarKind::Timestamp) => parse_timestamp(&s, column),
        (CellValue::Text(s), ScalarKind::Uuid) => Uuid::parse_str(s.trim())
            .map(CellValue::Uuid)
            .map_err(|_| {
                MaterializeError::invalid_value(column, format!("'{}' is not a uuid", s.trim()))
            }),
        (CellValue::Text(s), ScalarKind::Bytes) => Ok(CellValue::Bytes(s.into_bytes())),
        (cell, ScalarKind::Text) => format_text(cell, column),
        (other, k) => Err(MaterializeError::invalid_value(
            column,
            format!(
                "cannot lexically convert {} to {}",
                other.type_name(),
                k.name()
            ),
        )),
    }
}

fn format_text(cell: CellValue, column: &str) -> MaterializeResult<CellValue> {
    match cell {
        CellValue::Text(s) => Ok(CellValue::Text(s)),
        CellValue::Int(v) => Ok(CellValue::Text(v.to_string())),
        CellValue::Float(v) => Ok(CellValue::Text(v.to_string())),
        CellValue::Bool(v) => Ok(CellValue::Text(v.to_string())),
        CellValue::Timestamp(v) => Ok(CellValue::Text(v.to_rfc3339())),
        CellValue::Uuid(v) => Ok(CellValue::Text(v.to_string())),
        CellValue::Bytes(b) => String::from_utf8(b).map(CellValue::Text).map_err(|_| {
            MaterializeError::invalid_value(column, "binary data is not valid UTF-8")
        }),
        CellValue::Null => Ok(CellValue::Text(String::new())),
    }
}

fn parse_timestamp(s: &str, column: &str) -> MaterializeResult<CellValue> {
    let s = s.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Ok(CellValue::Timestamp(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(CellValue::Timestamp(parsed.and_utc()));
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
            return Ok(CellValue::Timestamp(midnight.and_utc()));
        }
    }
    Err(MaterializeError::invalid_value(
        column,
        format!("'{}' is not a timestamp", s),
    ))
}

fn enum_lookup(
    cell: CellValue,
    enumeration: &EnumDescriptor,
    column: &str,
) -> MaterializeResult<CellValue> {
    match cell {
        CellValue::Int(d) => {
            if enumeration.contains(d) {
                Ok(CellValue::Int(d))
            } else {
                Err(MaterializeError::invalid_value(
                    column,
                    format!("{} is not a discriminant of enum {}", d, enumeration.name),
                ))
            }
        }
        CellValue::Text(s) => enumeration
            .discriminant_of(s.trim())
            .map(CellValue::Int)
            .ok_or_else(|| {
                MaterializeError::invalid_value(
                    column,
                    format!("'{}' is not a variant of enum {}", s.trim(), enumeration.name),
                )
            }),
        other => Err(MaterializeError::invalid_value(
            column,
            format!(
                "cannot resolve enum {} from {}",
                enumeration.name,
                other.type_name()
            ),
        )),
    }
}
