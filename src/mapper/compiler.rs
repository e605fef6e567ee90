//! Routine compilation.
//!
//! Compilation turns a binding plan into a reusable conversion closure: all
//! slot resolution, arity validation, and rule lookup happens here, once,
//! so the per-row path only reads ordinals, applies prepared rules, and
//! invokes prepared setters. Compiling is expected to cost markedly more
//! than running the result; the routine cache exists for exactly that
//! asymmetry.

use crate::config::MaterializeOptions;
use crate::db::cursor::RawRow;
use crate::descriptor::{Args, DeclaredType, MemberSlot, TypeDescriptor};
use crate::error::{MaterializeError, MaterializeResult};
use crate::mapper::binder::{BindingPlan, BindingStep};
use crate::mapper::coercer::{self, CoercionRule};
use std::sync::Arc;

/// A compiled, reusable row conversion routine.
///
/// Stateless and thread-safe: the routine only reads the row it is given
/// and the immutable plan captured at compile time, so one instance is
/// freely shared between callers and the cache.
pub struct RowConverter<T> {
    routine: Arc<dyn Fn(&dyn RawRow) -> MaterializeResult<T> + Send + Sync>,
}

impl<T> Clone for RowConverter<T> {
    fn clone(&self) -> Self {
        Self {
            routine: Arc::clone(&self.routine),
        }
    }
}

impl<T> RowConverter<T> {
    /// Convert one raw row into an instance.
    pub fn convert(&self, row: &dyn RawRow) -> MaterializeResult<T> {
        (self.routine)(row)
    }

    /// Wrap a prepared routine.
    pub fn from_fn(
        routine: impl Fn(&dyn RawRow) -> MaterializeResult<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            routine: Arc::new(routine),
        }
    }
}

impl<T> std::fmt::Debug for RowConverter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RowConverter")
    }
}

struct ArgStep {
    ordinal: usize,
    column: String,
    target: DeclaredType,
    rule: CoercionRule,
}

struct AssignStep<T> {
    slot: Arc<MemberSlot<T>>,
    ordinal: usize,
    column: String,
    target: DeclaredType,
    rule: CoercionRule,
}

/// Compile a binding plan into a row conversion routine.
///
/// The routine reads each referenced ordinal, applies its coercion rule,
/// and synthesizes the instance constructor-first: arguments are passed to
/// the chosen constructor, then leftover members are assigned, then the
/// post-materialization hook runs on the completed instance.
pub fn compile<T: 'static>(
    plan: BindingPlan,
    descriptor: &Arc<TypeDescriptor<T>>,
    options: &MaterializeOptions,
) -> MaterializeResult<RowConverter<T>> {
    let mut arg_steps: Vec<ArgStep> = Vec::new();
    let mut assign_steps: Vec<AssignStep<T>> = Vec::new();

    for step in plan.steps() {
        match step {
            BindingStep::ConstructorArg {
                param,
                ordinal,
                column,
                target,
                rule,
            } => {
                if *param != arg_steps.len() {
                    return Err(MaterializeError::internal(
                        "constructor arguments are out of declaration order",
                    ));
                }
                arg_steps.push(ArgStep {
                    ordinal: *ordinal,
                    column: column.clone(),
                    target: target.clone(),
                    rule: rule.clone(),
                });
            }
            BindingStep::MemberAssign {
                member,
                ordinal,
                column,
                target,
                rule,
            } => {
                let slot = descriptor.member(*member).ok_or_else(|| {
                    MaterializeError::internal("binding plan references an unknown member")
                })?;
                assign_steps.push(AssignStep {
                    slot: Arc::clone(slot),
                    ordinal: *ordinal,
                    column: column.clone(),
                    target: target.clone(),
                    rule: rule.clone(),
                });
            }
        }
    }

    let constructor = plan.constructor();
    if let Some(index) = constructor {
        let arity = descriptor
            .constructor(index)
            .ok_or_else(|| {
                MaterializeError::internal("binding plan references an unknown constructor")
            })?
            .arity();
        if arity != arg_steps.len() {
            return Err(MaterializeError::internal(format!(
                "binding plan supplies {} arguments for a {}-parameter constructor",
                arg_steps.len(),
                arity
            )));
        }
    } else if !arg_steps.is_empty() {
        return Err(MaterializeError::internal(
            "binding plan has constructor arguments but no constructor",
        ));
    } else if !descriptor.default_constructible() {
        return Err(MaterializeError::internal(format!(
            "type '{}' has no default constructor for an assignment-only plan",
            descriptor.type_name()
        )));
    }

    let descriptor = Arc::clone(descriptor);
    let policy = options.null_policy;

    let routine = move |row: &dyn RawRow| -> MaterializeResult<T> {
        let mut instance = match constructor {
            Some(index) => {
                let mut values = Vec::with_capacity(arg_steps.len());
                for step in &arg_steps {
                    let raw = row.value(step.ordinal);
                    let coerced =
                        coercer::apply(&step.rule, raw, &step.column, &step.target, policy)?;
                    values.push((step.column.clone(), coerced));
                }
                let spec = descriptor.constructor(index).ok_or_else(|| {
                    MaterializeError::internal("compiled constructor index out of range")
                })?;
                spec.invoke(Args::new(values))?
            }
            None => descriptor.default_instance()?,
        };

        for step in &assign_steps {
            let raw = row.value(step.ordinal);
            let coerced = coercer::apply(&step.rule, raw, &step.column, &step.target, policy)?;
            step.slot.set(&mut instance, coerced)?;
        }

        match descriptor.post_hook() {
            Some(hook) => hook(instance),
            None => Ok(instance),
        }
    };

    Ok(RowConverter {
        routine: Arc::new(routine),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullPolicy;
    use crate::db::cursor::Row;
    use crate::descriptor::param;
    use crate::mapper::binder::bind;
    use crate::mapper::matcher::match_columns;
    use crate::models::{CellValue, RowSchema, TypeTag};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, PartialEq)]
    struct Event {
        id: i64,
        label: String,
        weight: Option<f64>,
    }

    fn compile_for(
        descriptor: TypeDescriptor<Event>,
        schema: &RowSchema,
        options: &MaterializeOptions,
    ) -> MaterializeResult<RowConverter<Event>> {
        let descriptor = Arc::new(descriptor);
        let matched = match_columns(schema, &descriptor, options);
        let plan = bind(&matched, &descriptor, options)?;
        compile(plan, &descriptor, options)
    }

    fn assign_descriptor() -> TypeDescriptor<Event> {
        TypeDescriptor::builder("Event")
            .default_fn(Event::default)
            .member("id", |e: &mut Event, v: i64| e.id = v)
            .member("label", |e: &mut Event, v: String| e.label = v)
            .member("weight", |e: &mut Event, v: Option<f64>| e.weight = v)
            .build()
    }

    #[test]
    fn test_assignment_routine_populates_members() {
        let schema = RowSchema::from_columns(vec![
            ("id", TypeTag::Integer),
            ("label", TypeTag::Text),
            ("weight", TypeTag::Float),
        ]);
        let options = MaterializeOptions::new();
        let converter = compile_for(assign_descriptor(), &schema, &options).unwrap();
        let row = Row::new(vec![
            CellValue::Int(7),
            CellValue::Text("seven".to_string()),
            CellValue::Float(7.5),
        ]);
        let event = converter.convert(&row).unwrap();
        assert_eq!(
            event,
            Event {
                id: 7,
                label: "seven".to_string(),
                weight: Some(7.5),
            }
        );
    }

    #[test]
    fn test_constructor_routine_runs_ctor_then_assigns() {
        static CTOR_CALLS: AtomicUsize = AtomicUsize::new(0);
        let descriptor = TypeDescriptor::<Event>::builder("Event")
            .constructor(
                vec![param::<i64>("id"), param::<String>("label")],
                |mut args| {
                    CTOR_CALLS.fetch_add(1, Ordering::SeqCst);
                    Ok(Event {
                        id: args.take()?,
                        label: args.take()?,
                        weight: None,
                    })
                },
            )
            .member("weight", |e: &mut Event, v: Option<f64>| e.weight = v)
            .build();
        let schema = RowSchema::from_columns(vec![
            ("id", TypeTag::Integer),
            ("label", TypeTag::Text),
            ("weight", TypeTag::Float),
        ]);
        let options = MaterializeOptions::new();
        let converter = compile_for(descriptor, &schema, &options).unwrap();

        let before = CTOR_CALLS.load(Ordering::SeqCst);
        let row = Row::new(vec![
            CellValue::Int(1),
            CellValue::Text("a".to_string()),
            CellValue::Float(0.5),
        ]);
        let event = converter.convert(&row).unwrap();
        assert_eq!(CTOR_CALLS.load(Ordering::SeqCst), before + 1);
        assert_eq!(event.id, 1);
        assert_eq!(event.weight, Some(0.5));
    }

    #[test]
    fn test_post_hook_sees_constructed_state() {
        let descriptor = TypeDescriptor::<Event>::builder("Event")
            .default_fn(Event::default)
            .member("label", |e: &mut Event, v: String| e.label = v)
            .after_load(|mut event| {
                event.label = event.label.to_uppercase();
                Ok(event)
            })
            .build();
        let schema = RowSchema::from_columns(vec![("label", TypeTag::Text)]);
        let options = MaterializeOptions::new();
        let converter = compile_for(descriptor, &schema, &options).unwrap();
        let row = Row::new(vec![CellValue::Text("quiet".to_string())]);
        assert_eq!(converter.convert(&row).unwrap().label, "QUIET");
    }

    #[test]
    fn test_null_into_non_nullable_is_a_row_error() {
        let schema =
            RowSchema::from_columns(vec![("id", TypeTag::Integer), ("label", TypeTag::Text)]);
        let options = MaterializeOptions::new();
        let converter = compile_for(assign_descriptor(), &schema, &options).unwrap();

        let bad = Row::new(vec![CellValue::Null, CellValue::Text("x".to_string())]);
        let err = converter.convert(&bad).unwrap_err();
        assert!(matches!(err, MaterializeError::NullCoercion { .. }));

        // The routine is not poisoned: a clean row still converts.
        let good = Row::new(vec![CellValue::Int(3), CellValue::Text("y".to_string())]);
        assert_eq!(converter.convert(&good).unwrap().id, 3);
    }

    #[test]
    fn test_zero_value_policy_substitutes_defaults() {
        let schema =
            RowSchema::from_columns(vec![("id", TypeTag::Integer), ("label", TypeTag::Text)]);
        let options = MaterializeOptions::new().with_null_policy(NullPolicy::ZeroValue);
        let converter = compile_for(assign_descriptor(), &schema, &options).unwrap();
        let row = Row::new(vec![CellValue::Null, CellValue::Null]);
        let event = converter.convert(&row).unwrap();
        assert_eq!(event.id, 0);
        assert_eq!(event.label, "");
    }

    #[test]
    fn test_converter_is_send_and_sync() {
        fn assert_send_sync<V: Send + Sync>(_: &V) {}
        let schema = RowSchema::from_columns(vec![("id", TypeTag::Integer)]);
        let options = MaterializeOptions::new();
        let converter = compile_for(assign_descriptor(), &schema, &options).unwrap();
        assert_send_sync(&converter);
    }
}
