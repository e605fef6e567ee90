//! Binding strategy selection.
//!
//! Given matched columns, the binder decides how instances are synthesized:
//! through the best fully-satisfied parameterized constructor, through
//! default construction plus member assignment, or a hybrid of both. The
//! output is a binding plan with one coercion rule per bound column, so all
//! conversion decisions are made exactly once per (type, schema) pair.

use crate::config::MaterializeOptions;
use crate::descriptor::{DeclaredType, TypeDescriptor};
use crate::error::{MaterializeError, MaterializeResult};
use crate::mapper::coercer::{self, CoercionRule};
use crate::mapper::matcher::MatchResult;
use std::collections::HashSet;
use tracing::debug;

/// One step of a binding plan.
#[derive(Debug)]
pub enum BindingStep {
    /// Feed a coerced column value to the chosen constructor.
    ConstructorArg {
        /// Parameter position within the chosen constructor.
        param: usize,
        ordinal: usize,
        column: String,
        target: DeclaredType,
        rule: CoercionRule,
    },
    /// Assign a coerced column value to a member after construction.
    MemberAssign {
        /// Member index within the type descriptor.
        member: usize,
        ordinal: usize,
        column: String,
        target: DeclaredType,
        rule: CoercionRule,
    },
}

/// The resolved recipe for turning one row into one instance.
///
/// Constructor arguments come first, in declared parameter order, followed
/// by member assignments in schema order.
#[derive(Debug)]
pub struct BindingPlan {
    constructor: Option<usize>,
    steps: Vec<BindingStep>,
}

impl BindingPlan {
    /// Get the chosen constructor's rank index, or `None` for
    /// default-construct-then-assign.
    pub fn constructor(&self) -> Option<usize> {
        self.constructor
    }

    /// Get the steps in execution order.
    pub fn steps(&self) -> &[BindingStep] {
        &self.steps
    }

    /// Check if the plan synthesizes through a parameterized constructor.
    pub fn uses_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Get the number of bound columns.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan binds no columns.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Resolve a binding plan for matched columns.
///
/// Selection policy: the constructor with the most parameters whose
/// parameters are all satisfied by matched columns wins; the ranking is by
/// parameter count descending with declaration order breaking ties. Matched
/// columns the constructor does not consume are appended as member
/// assignments. With no qualifying constructor the plan falls back to
/// default construction plus assignment.
pub fn bind<T: 'static>(
    matched: &MatchResult,
    descriptor: &TypeDescriptor<T>,
    options: &MaterializeOptions,
) -> MaterializeResult<BindingPlan> {
    let chosen = descriptor
        .constructors()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.arity() > 0)
        .find(|(_, c)| {
            c.params()
                .iter()
                .all(|p| matched.entry_for(&options.normalize(&p.name)).is_some())
        })
        .map(|(index, _)| index);

    let mut steps = Vec::new();
    let mut consumed: HashSet<String> = HashSet::new();

    if let Some(index) = chosen {
        let constructor = descriptor
            .constructor(index)
            .ok_or_else(|| MaterializeError::internal("chosen constructor index out of range"))?;
        for (param_index, param) in constructor.params().iter().enumerate() {
            let normalized = options.normalize(&param.name);
            let entry = matched.entry_for(&normalized).ok_or_else(|| {
                MaterializeError::internal("satisfied constructor parameter lost its match")
            })?;
            let rule = coercer::coerce(entry.source_type, &param.declared, None, &entry.column)?;
            steps.push(BindingStep::ConstructorArg {
                param: param_index,
                ordinal: entry.ordinal,
                column: entry.column.clone(),
                target: param.declared.clone(),
                rule,
            });
            consumed.insert(normalized);
        }
    } else if !descriptor.default_constructible() {
        return Err(MaterializeError::no_viable_binding(
            descriptor.type_name(),
            "no constructor is fully satisfied by the result columns \
             and the type has no default constructor",
        ));
    }

    for entry in matched.entries() {
        if consumed.contains(&entry.normalized) {
            continue;
        }
        let Some(member_index) = entry.member else {
            continue;
        };
        let member = descriptor
            .member(member_index)
            .ok_or_else(|| MaterializeError::internal("matched member index out of range"))?;
        if !member.assignable() {
            continue;
        }
        let rule = coercer::coerce(
            entry.source_type,
            member.declared(),
            member.converter(),
            &entry.column,
        )?;
        steps.push(BindingStep::MemberAssign {
            member: member_index,
            ordinal: entry.ordinal,
            column: entry.column.clone(),
            target: member.declared().clone(),
            rule,
        });
    }

    if steps.is_empty() {
        return Err(MaterializeError::no_viable_binding(
            descriptor.type_name(),
            "none of the result columns bind to a constructor parameter or assignable member",
        ));
    }

    debug!(
        type_name = descriptor.type_name(),
        constructor = ?chosen,
        steps = steps.len(),
        "resolved binding plan"
    );

    Ok(BindingPlan {
        constructor: chosen,
        steps,
    })
}
