//! Pure predicate evaluation against normalized media items.
//!
//! The evaluator is shared by the server-side scanner and the client-side
//! dry-run preview, so it must stay synchronous, deterministic for a fixed
//! [`EvalContext`], and free of I/O.

mod compare;
mod resolve;

use chrono::{DateTime, Utc};
use prunarr_model::{
    ConditionNode, CriteriaNode, FieldType, GroupNode, GroupOperator,
    MediaItem, Operator,
};
use tracing::warn;

use crate::registry;

pub use resolve::{FieldValue, resolve};

/// Evaluation context captured once at scan start. Relative-date operators
/// measure against `now`, so every item in one scan sees the same
/// thresholds.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext {
    pub now: DateTime<Utc>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates a predicate tree against one item.
pub fn evaluate(item: &MediaItem, tree: &GroupNode, ctx: &EvalContext) -> bool {
    evaluate_group(item, tree, ctx)
}

fn evaluate_group(item: &MediaItem, group: &GroupNode, ctx: &EvalContext) -> bool {
    // Children are evaluated left to right and short-circuit through the
    // iterator adapters. Empty AND is vacuously true, empty OR false.
    match group.operator {
        GroupOperator::And => group
            .conditions
            .iter()
            .all(|node| evaluate_node(item, node, ctx)),
        GroupOperator::Or => group
            .conditions
            .iter()
            .any(|node| evaluate_node(item, node, ctx)),
    }
}

fn evaluate_node(item: &MediaItem, node: &CriteriaNode, ctx: &EvalContext) -> bool {
    match node {
        CriteriaNode::Group(group) => evaluate_group(item, group, ctx),
        CriteriaNode::Condition(condition) => {
            evaluate_condition(item, condition, ctx)
        }
    }
}

fn evaluate_condition(
    item: &MediaItem,
    condition: &ConditionNode,
    ctx: &EvalContext,
) -> bool {
    let Some(field) = registry::lookup(&condition.field) else {
        warn!(field = %condition.field, "rule references unknown field");
        return false;
    };
    if !field.allows(condition.operator) {
        warn!(
            field = %field.key,
            operator = %condition.operator,
            "operator not allowed for field"
        );
        return false;
    }

    let resolved = resolve(item, field.key, ctx.now);

    // Presence checks apply before any type dispatch.
    match condition.operator {
        Operator::IsNull => return resolved.is_absent(),
        Operator::IsNotNull => return !resolved.is_absent(),
        _ => {}
    }

    if resolved.is_absent() {
        // An item with no watch history is infinitely old, so
        // `lastWatchedAt olderThan N` must match it. Every other operator
        // on an absent value fails safe.
        return field.key == "lastWatchedAt"
            && condition.operator == Operator::OlderThan;
    }

    let value = condition.value.as_ref();
    match field.field_type {
        FieldType::String | FieldType::Enum => match resolved {
            FieldValue::Text(actual) => {
                compare::strings(&actual, condition.operator, value)
            }
            _ => false,
        },
        FieldType::Number => match resolved {
            FieldValue::Number(actual) => {
                compare::numbers(actual, condition.operator, value)
            }
            _ => false,
        },
        FieldType::Date => match resolved {
            FieldValue::Date(actual) => compare::dates(
                actual,
                condition.operator,
                value,
                condition.value_unit,
                ctx.now,
            ),
            _ => false,
        },
        FieldType::Boolean => match resolved {
            FieldValue::Bool(actual) => {
                compare::booleans(actual, condition.operator, value)
            }
            _ => false,
        },
        FieldType::Array => match resolved {
            FieldValue::List(actual) => {
                compare::arrays(&actual, condition.operator, value)
            }
            _ => false,
        },
    }
}
