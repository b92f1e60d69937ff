//! Boolean expressions guarding workflow edges.
//!
//! Conditions are plain data evaluated against the JSON form of the
//! execution context. Paths are dot-separated field lookups; a missing
//! intermediate field resolves to "undefined" instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Exists,
    NotExists,
    /// Any operator name this build does not know. Always evaluates false.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    And,
    Or,
}

/// Right-hand side of a property test: a literal, or another context path
/// (`{"ref": "config.maxAuthorizeAttempts"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Ref {
        #[serde(rename = "ref")]
        path: String,
    },
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCondition {
    pub path: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Operand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: GroupOperator,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// A bare list is an implicit AND.
    All(Vec<Condition>),
    Group(ConditionGroup),
    Property(PropertyCondition),
}

impl Condition {
    /// Compares the value at `path` with a literal.
    pub fn property(path: impl Into<String>, operator: Operator, value: Value) -> Self {
        Condition::Property(PropertyCondition {
            path: path.into(),
            operator,
            value: Some(Operand::Literal(value)),
        })
    }

    /// Compares the values at two context paths.
    pub fn compare_paths(
        path: impl Into<String>,
        operator: Operator,
        other: impl Into<String>,
    ) -> Self {
        Condition::Property(PropertyCondition {
            path: path.into(),
            operator,
            value: Some(Operand::Ref { path: other.into() }),
        })
    }

    /// Holds when `path` resolves to a non-null value.
    pub fn exists(path: impl Into<String>) -> Self {
        Condition::Property(PropertyCondition {
            path: path.into(),
            operator: Operator::Exists,
            value: None,
        })
    }

    /// Holds when every condition holds.
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup {
            operator: GroupOperator::And,
            conditions,
        })
    }

    /// Holds when any condition holds.
    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup {
            operator: GroupOperator::Or,
            conditions,
        })
    }
}

/// Evaluates an optional condition. An absent condition always holds.
pub fn evaluate(condition: Option<&Condition>, context: &Value) -> bool {
    match condition {
        None => true,
        Some(condition) => evaluate_condition(condition, context),
    }
}

/// Evaluates one condition against the context.
pub fn evaluate_condition(condition: &Condition, context: &Value) -> bool {
    match condition {
        Condition::All(conditions) => conditions.iter().all(|c| evaluate_condition(c, context)),
        Condition::Group(group) => match group.operator {
            GroupOperator::And => group.conditions.iter().all(|c| evaluate_condition(c, context)),
            GroupOperator::Or => group.conditions.iter().any(|c| evaluate_condition(c, context)),
        },
        Condition::Property(property) => evaluate_property(property, context),
    }
}

/// Sequential nested-field lookup. Numeric segments index into arrays.
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn evaluate_property(property: &PropertyCondition, context: &Value) -> bool {
    let actual = resolve_path(context, &property.path).filter(|v| !v.is_null());
    let expected = match &property.value {
        None => None,
        Some(Operand::Literal(value)) => Some(value),
        Some(Operand::Ref { path }) => resolve_path(context, path),
    }
    .filter(|v| !v.is_null());

    match property.operator {
        Operator::Equals => match actual {
            None => expected.is_none(),
            Some(actual) => expected.is_some_and(|expected| strict_equals(actual, expected)),
        },
        Operator::NotEquals => match actual {
            None => expected.is_some(),
            Some(actual) => !expected.is_some_and(|expected| strict_equals(actual, expected)),
        },
        Operator::In => match (actual, expected) {
            (Some(actual), Some(Value::Array(items))) => {
                items.iter().any(|item| strict_equals(actual, item))
            }
            _ => false,
        },
        Operator::NotIn => match (actual, expected) {
            (None, _) => true,
            (Some(actual), Some(Value::Array(items))) => {
                !items.iter().any(|item| strict_equals(actual, item))
            }
            _ => true,
        },
        Operator::GreaterThan => compare(actual, expected, |a, b| a > b),
        Operator::LessThan => compare(actual, expected, |a, b| a < b),
        Operator::GreaterThanOrEqual => compare(actual, expected, |a, b| a >= b),
        Operator::LessThanOrEqual => compare(actual, expected, |a, b| a <= b),
        Operator::Exists => actual.is_some(),
        Operator::NotExists => actual.is_none(),
        Operator::Unknown => false,
    }
}

// serde_json keeps integers and floats apart; 1 and 1.0 must compare equal.
fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(actual: Option<&Value>, expected: Option<&Value>, op: fn(f64, f64) -> bool) -> bool {
    match (
        actual.and_then(Value::as_f64),
        expected.and_then(Value::as_f64),
    ) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}
