use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of comparison operators usable in rule conditions.
///
/// Which operators are legal for a given field is decided by the field
/// registry; the evaluator rejects anything outside that set at runtime by
/// failing the condition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    In,
    NotIn,
    Gt,
    Ge,
    Lt,
    Le,
    Between,
    Before,
    After,
    OlderThan,
    NewerThan,
    IsNull,
    IsNotNull,
    ContainsAny,
    ContainsAll,
    IsEmpty,
    IsNotEmpty,
}

impl Operator {
    /// Wire name as it appears in persisted criteria JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Regex => "regex",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Between => "between",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::OlderThan => "olderThan",
            Operator::NewerThan => "newerThan",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::ContainsAny => "containsAny",
            Operator::ContainsAll => "containsAll",
            Operator::IsEmpty => "isEmpty",
            Operator::IsNotEmpty => "isNotEmpty",
        }
    }

    /// Human label used by the rule builder UI.
    pub fn label(&self) -> &'static str {
        match self {
            Operator::Equals => "is",
            Operator::NotEquals => "is not",
            Operator::Contains => "contains",
            Operator::NotContains => "does not contain",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::Regex => "matches pattern",
            Operator::In => "is one of",
            Operator::NotIn => "is not one of",
            Operator::Gt => "greater than",
            Operator::Ge => "at least",
            Operator::Lt => "less than",
            Operator::Le => "at most",
            Operator::Between => "between",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::OlderThan => "older than",
            Operator::NewerThan => "newer than",
            Operator::IsNull => "is not set",
            Operator::IsNotNull => "is set",
            Operator::ContainsAny => "contains any of",
            Operator::ContainsAll => "contains all of",
            Operator::IsEmpty => "is empty",
            Operator::IsNotEmpty => "is not empty",
        }
    }

    /// Operator set for free-text fields.
    pub const fn for_strings() -> &'static [Operator] {
        use Operator::*;
        &[
            Equals, NotEquals, Contains, NotContains, StartsWith, EndsWith,
            Regex, In, NotIn,
        ]
    }

    /// Operator set for numeric fields.
    pub const fn for_numbers() -> &'static [Operator] {
        use Operator::*;
        &[Equals, NotEquals, Gt, Ge, Lt, Le, Between]
    }

    /// Operator set for date fields.
    pub const fn for_dates() -> &'static [Operator] {
        use Operator::*;
        &[Before, After, Between, OlderThan, NewerThan, IsNull, IsNotNull]
    }

    /// Operator set for boolean fields.
    pub const fn for_booleans() -> &'static [Operator] {
        use Operator::*;
        &[Equals, NotEquals]
    }

    /// Operator set for array fields.
    pub const fn for_arrays() -> &'static [Operator] {
        use Operator::*;
        &[Contains, NotContains, ContainsAny, ContainsAll, IsEmpty, IsNotEmpty]
    }

    /// Requires a `valueUnit` of days/months/years when applied to a date.
    pub fn is_relative_date(&self) -> bool {
        matches!(self, Operator::OlderThan | Operator::NewerThan)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
