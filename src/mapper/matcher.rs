//! Field matcher.
//!
//! Pairs schema columns with target members and constructor parameters by
//! normalized name. Pure function of its inputs: no side effects, columns
//! without a match are recorded as unused and never cause failure.

use crate::config::MaterializeOptions;
use crate::descriptor::TypeDescriptor;
use crate::models::{RowSchema, TypeTag};
use std::collections::{HashMap, HashSet};

/// One column paired with a candidate slot.
#[derive(Debug, Clone)]
pub struct MatchEntry {
    /// Column position within the row.
    pub ordinal: usize,
    /// Column name as reported by the cursor.
    pub column: String,
    /// Normalized name used for the pairing.
    pub normalized: String,
    /// Value type reported for the column.
    pub source_type: TypeTag,
    /// Index of the matching member, if the name resolved to one. `None`
    /// means the name only matches a constructor parameter.
    pub member: Option<usize>,
}

/// Result of pairing a schema against a type descriptor.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    entries: Vec<MatchEntry>,
    unused: Vec<usize>,
}

impl MatchResult {
    /// Get the matched columns in schema order.
    pub fn entries(&self) -> &[MatchEntry] {
        &self.entries
    }

    /// Get the ordinals of columns that matched nothing (or lost a
    /// duplicate-name race).
    pub fn unused(&self) -> &[usize] {
        &self.unused
    }

    /// Find the entry for a normalized name.
    pub fn entry_for(&self, normalized: &str) -> Option<&MatchEntry> {
        self.entries.iter().find(|e| e.normalized == normalized)
    }

    /// Check whether any column matched.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pair each schema column with a member or constructor parameter of the
/// target type by normalized name.
///
/// Only the first column with a given normalized name is matchable; later
/// duplicates are treated as unused.
pub fn match_columns<T: 'static>(
    schema: &RowSchema,
    descriptor: &TypeDescriptor<T>,
    options: &MaterializeOptions,
) -> MatchResult {
    let mut member_names: HashMap<String, usize> = HashMap::new();
    for (index, member) in descriptor.members().iter().enumerate() {
        member_names
            .entry(options.normalize(member.name()))
            .or_insert(index);
    }

    let mut param_names: HashSet<String> = HashSet::new();
    for constructor in descriptor.constructors() {
        for param in constructor.params() {
            param_names.insert(options.normalize(&param.name));
        }
    }

    let mut result = MatchResult::default();
    let mut seen: HashSet<String> = HashSet::new();
    for column in schema.columns() {
        let normalized = options.normalize(&column.name);
        if !seen.insert(normalized.clone()) {
            result.unused.push(column.ordinal);
            continue;
        }
        let member = member_names.get(&normalized).copied();
        if member.is_none() && !param_names.contains(&normalized) {
            result.unused.push(column.ordinal);
            continue;
        }
        result.entries.push(MatchEntry {
            ordinal: column.ordinal,
            column: column.name.clone(),
            normalized,
            source_type: column.source_type,
            member,
        });
    }
    result
}
