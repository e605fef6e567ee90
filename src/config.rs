//! Configuration for the materialization engine.
//!
//! This module provides the options that shape how column names are matched
//! against type members and how null values are handled at row-conversion
//! time. Options are fixed at `Materializer` construction; compiled routines
//! capture them, so changing options means using a fresh engine.

/// Default behavior for a null value arriving at a non-nullable target.
pub const DEFAULT_NULL_POLICY: NullPolicy = NullPolicy::ErrorOnNull;

/// Policy for null values that reach a non-nullable target member or
/// constructor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Fail the row with a null-coercion error (default).
    #[default]
    ErrorOnNull,
    /// Substitute the target type's zero value (0, 0.0, false, "", epoch, nil).
    ZeroValue,
}

impl std::fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ErrorOnNull => write!(f, "error_on_null"),
            Self::ZeroValue => write!(f, "zero_value"),
        }
    }
}

/// Options controlling name matching and null handling.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOptions {
    /// Prefix stripped from column names before matching (e.g. `tbl_`).
    /// Compared case-insensitively, stripped at most once.
    pub strip_prefix: Option<String>,
    /// Ignore underscores when matching, so `first_name` matches `firstname`.
    pub ignore_underscores: bool,
    /// Behavior for null values at non-nullable targets.
    pub null_policy: NullPolicy,
}

impl MaterializeOptions {
    /// Create options with the default matching rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix to strip from column names before matching.
    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = Some(prefix.into());
        self
    }

    /// Ignore underscores when matching names.
    pub fn with_ignore_underscores(mut self, ignore: bool) -> Self {
        self.ignore_underscores = ignore;
        self
    }

    /// Set the null policy.
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Normalize a column or member name for matching.
    ///
    /// Matching is case-insensitive; the configured prefix is stripped once
    /// from the front, and underscores are removed when
    /// `ignore_underscores` is set.
    pub fn normalize(&self, name: &str) -> String {
        let mut normalized = name.to_lowercase();
        if let Some(prefix) = &self.strip_prefix {
            let prefix = prefix.to_lowercase();
            if let Some(rest) = normalized.strip_prefix(&prefix) {
                normalized = rest.to_string();
            }
        }
        if self.ignore_underscores {
            normalized.retain(|c| c != '_');
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = MaterializeOptions::default();
        assert!(options.strip_prefix.is_none());
        assert!(!options.ignore_underscores);
        assert_eq!(options.null_policy, NullPolicy::ErrorOnNull);
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        let options = MaterializeOptions::new();
        assert_eq!(options.normalize("FirstName"), "firstname");
        assert_eq!(options.normalize("FIRST_NAME"), "first_name");
    }

    #[test]
    fn test_normalize_strips_prefix_once() {
        let options = MaterializeOptions::new().with_strip_prefix("tbl_");
        assert_eq!(options.normalize("tbl_name"), "name");
        assert_eq!(options.normalize("TBL_Name"), "name");
        // Only the leading occurrence is stripped.
        assert_eq!(options.normalize("tbl_tbl_name"), "tbl_name");
        // Non-prefixed names are untouched.
        assert_eq!(options.normalize("name"), "name");
    }

    #[test]
    fn test_normalize_ignores_underscores_when_configured() {
        let options = MaterializeOptions::new().with_ignore_underscores(true);
        assert_eq!(options.normalize("first_name"), "firstname");
        assert_eq!(options.normalize("FirstName"), "firstname");
    }

    #[test]
    fn test_null_policy_display() {
        assert_eq!(NullPolicy::ErrorOnNull.to_string(), "error_on_null");
        assert_eq!(NullPolicy::ZeroValue.to_string(), "zero_value");
    }
}
