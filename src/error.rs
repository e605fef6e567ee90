//! Error types for rowbind.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. The taxonomy separates plan-time failures (raised once while a
//! conversion routine is being resolved, never cached) from row-time failures
//! (raised per row, leaving the cached routine intact for subsequent rows).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("No viable binding for type '{type_name}': {reason}")]
    NoViableBinding { type_name: String, reason: String },

    #[error(
        "Unsupported conversion for column '{column}': no rule from {source_type} to {target}"
    )]
    UnsupportedConversion {
        column: String,
        source_type: String,
        target: String,
    },

    #[error("Column '{column}' is null but the target {target} is not nullable")]
    NullCoercion { column: String, target: String },

    #[error("Value {value} from column '{column}' cannot be represented as {target}")]
    ConversionOverflow {
        column: String,
        value: String,
        target: String,
    },

    #[error("Invalid value in column '{column}': {message}")]
    InvalidValue { column: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MaterializeError {
    /// Create a no-viable-binding error.
    pub fn no_viable_binding(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoViableBinding {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-conversion error.
    pub fn unsupported_conversion(
        column: impl Into<String>,
        source_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnsupportedConversion {
            column: column.into(),
            source_type: source_type.into(),
            target: target.into(),
        }
    }

    /// Create a null-coercion error.
    pub fn null_coercion(column: impl Into<String>, target: impl Into<String>) -> Self {
        Self::NullCoercion {
            column: column.into(),
            target: target.into(),
        }
    }

    /// Create a conversion-overflow error.
    pub fn overflow(
        column: impl Into<String>,
        value: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::ConversionOverflow {
            column: column.into(),
            value: value.into(),
            target: target.into(),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is raised while resolving a binding plan.
    ///
    /// Plan-time errors abort the whole materialization call and nothing is
    /// cached for the (type, schema) pair.
    pub fn is_plan_error(&self) -> bool {
        matches!(
            self,
            Self::NoViableBinding { .. } | Self::UnsupportedConversion { .. }
        )
    }

    /// Check if this error is raised while converting an individual row.
    ///
    /// Row-time errors are surfaced to the caller for that row only and do
    /// not poison the cached routine.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            Self::NullCoercion { .. }
                | Self::ConversionOverflow { .. }
                | Self::InvalidValue { .. }
        )
    }
}

/// Result type alias for materialization operations.
pub type MaterializeResult<T> = Result<T, MaterializeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MaterializeError::no_viable_binding("User", "no matching columns");
        assert!(err.to_string().contains("No viable binding"));
        assert!(err.to_string().contains("User"));
    }

    #[test]
    fn test_plan_errors() {
        assert!(MaterializeError::no_viable_binding("User", "x").is_plan_error());
        assert!(MaterializeError::unsupported_conversion("age", "bytes", "i32").is_plan_error());
        assert!(!MaterializeError::null_coercion("age", "i32").is_plan_error());
    }

    #[test]
    fn test_row_errors() {
        assert!(MaterializeError::null_coercion("age", "i32").is_row_error());
        assert!(MaterializeError::overflow("age", "70000", "i16").is_row_error());
        assert!(MaterializeError::invalid_value("id", "not a uuid").is_row_error());
        assert!(!MaterializeError::no_viable_binding("User", "x").is_row_error());
    }

    #[test]
    fn test_internal_is_neither_plan_nor_row() {
        let err = MaterializeError::internal("constructor arity mismatch");
        assert!(!err.is_plan_error());
        assert!(!err.is_row_error());
    }

    #[test]
    fn test_overflow_message_includes_value_and_target() {
        let err = MaterializeError::overflow("count", "70000", "i16");
        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("i16"));
        assert!(msg.contains("count"));
    }
}
