//! Raw value model.
//!
//! This module defines the tagged value a row cursor yields for one column,
//! and the logical category a cursor reports for a column's type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw value read from one column of one row.
///
/// Integers are carried as `i64` and floats as `f64` for maximum range; the
/// coercion layer narrows them to the declared member type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Temporal value in UTC
    Timestamp(DateTime<Utc>),
    /// Universally unique identifier
    Uuid(Uuid),
    /// String value
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Get the type tag this value falls under. Null has no tag.
    pub fn tag(&self) -> Option<TypeTag> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(TypeTag::Bool),
            Self::Int(_) => Some(TypeTag::Integer),
            Self::Float(_) => Some(TypeTag::Float),
            Self::Timestamp(_) => Some(TypeTag::Timestamp),
            Self::Uuid(_) => Some(TypeTag::Uuid),
            Self::Text(_) => Some(TypeTag::Text),
            Self::Bytes(_) => Some(TypeTag::Bytes),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Uuid(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Logical category for a column's runtime value type, as reported by the
/// active row cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Bool,
    Integer,
    Float,
    Text,
    Bytes,
    Timestamp,
    Uuid,
    /// The cursor could not classify the column; coercion falls back to
    /// lexical conversion.
    Unknown,
}

impl TypeTag {
    /// Get the tag name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
