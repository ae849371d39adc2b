//! Typed comparison primitives, one family per field type.
//!
//! Every function is fail-safe: a value of the wrong shape, an unparsable
//! timestamp, or an invalid regex yields `false` rather than an error.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use prunarr_model::{ConditionValue, Operator, ValueUnit};
use regex::RegexBuilder;

/// String and enum comparisons. Substring and prefix/suffix operators are
/// case-insensitive; `equals`/`notEquals`/`regex`/`in`/`notIn` are not
/// (regex is compiled case-insensitive instead). The ordinal operators
/// compare by plain string ordering, which is what ordered enum fields
/// fall back to.
pub fn strings(
    actual: &str,
    operator: Operator,
    value: Option<&ConditionValue>,
) -> bool {
    let expected = value.and_then(|v| v.as_str());
    match operator {
        Operator::Equals => expected.is_some_and(|v| actual == v),
        Operator::NotEquals => expected.is_some_and(|v| actual != v),
        Operator::Contains => expected.is_some_and(|v| {
            actual.to_lowercase().contains(&v.to_lowercase())
        }),
        Operator::NotContains => expected.is_some_and(|v| {
            !actual.to_lowercase().contains(&v.to_lowercase())
        }),
        Operator::StartsWith => expected.is_some_and(|v| {
            actual.to_lowercase().starts_with(&v.to_lowercase())
        }),
        Operator::EndsWith => expected.is_some_and(|v| {
            actual.to_lowercase().ends_with(&v.to_lowercase())
        }),
        Operator::Regex => expected.is_some_and(|pattern| {
            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => re.is_match(actual),
                Err(_) => false,
            }
        }),
        Operator::In => {
            value.is_some_and(|v| v.text_members().contains(&actual))
        }
        Operator::NotIn => {
            value.is_some_and(|v| !v.text_members().contains(&actual))
        }
        Operator::Gt => expected.is_some_and(|v| actual > v),
        Operator::Ge => expected.is_some_and(|v| actual >= v),
        Operator::Lt => expected.is_some_and(|v| actual < v),
        Operator::Le => expected.is_some_and(|v| actual <= v),
        _ => false,
    }
}

/// Numeric comparisons. `between` is inclusive on both ends.
pub fn numbers(
    actual: f64,
    operator: Operator,
    value: Option<&ConditionValue>,
) -> bool {
    let expected = value.and_then(|v| v.as_f64());
    match operator {
        Operator::Equals => expected.is_some_and(|v| actual == v),
        Operator::NotEquals => expected.is_some_and(|v| actual != v),
        Operator::Gt => expected.is_some_and(|v| actual > v),
        Operator::Ge => expected.is_some_and(|v| actual >= v),
        Operator::Lt => expected.is_some_and(|v| actual < v),
        Operator::Le => expected.is_some_and(|v| actual <= v),
        Operator::Between => bounds(value)
            .is_some_and(|(min, max)| actual >= min && actual <= max),
        _ => false,
    }
}

fn bounds(value: Option<&ConditionValue>) -> Option<(f64, f64)> {
    let list = value?.as_list()?;
    match list {
        [min, max] => Some((min.as_f64()?, max.as_f64()?)),
        _ => None,
    }
}

/// Date comparisons. Absolute operators take ISO timestamps (or bare
/// dates); `olderThan`/`newerThan` take a count plus a unit, with months
/// and years fixed to 30/365 days for determinism.
pub fn dates(
    actual: DateTime<Utc>,
    operator: Operator,
    value: Option<&ConditionValue>,
    value_unit: Option<ValueUnit>,
    now: DateTime<Utc>,
) -> bool {
    match operator {
        Operator::Before => {
            timestamp(value).is_some_and(|ts| actual < ts)
        }
        Operator::After => timestamp(value).is_some_and(|ts| actual > ts),
        Operator::Between => {
            let Some(list) = value.and_then(|v| v.as_list()) else {
                return false;
            };
            match list {
                [start, end] => {
                    let (Some(start), Some(end)) = (
                        timestamp(Some(start)),
                        timestamp(Some(end)),
                    ) else {
                        return false;
                    };
                    actual >= start && actual <= end
                }
                _ => false,
            }
        }
        Operator::OlderThan => {
            relative_threshold(value, value_unit, now)
                .is_some_and(|threshold| actual < threshold)
        }
        Operator::NewerThan => {
            relative_threshold(value, value_unit, now)
                .is_some_and(|threshold| actual > threshold)
        }
        _ => false,
    }
}

fn timestamp(value: Option<&ConditionValue>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn relative_threshold(
    value: Option<&ConditionValue>,
    value_unit: Option<ValueUnit>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let count = value?.as_f64()?;
    let unit = value_unit?;
    let days = (count * unit.days_factor() as f64).round() as i64;
    Some(now - Duration::days(days))
}

/// Boolean comparisons.
pub fn booleans(
    actual: bool,
    operator: Operator,
    value: Option<&ConditionValue>,
) -> bool {
    let expected = value.and_then(|v| v.as_bool());
    match operator {
        Operator::Equals => expected.is_some_and(|v| actual == v),
        Operator::NotEquals => expected.is_some_and(|v| actual != v),
        _ => false,
    }
}

/// Array comparisons. Membership ignores ASCII case so label and genre
/// matching is forgiving about capitalization.
pub fn arrays(
    actual: &[String],
    operator: Operator,
    value: Option<&ConditionValue>,
) -> bool {
    let has = |needle: &str| {
        actual.iter().any(|member| member.eq_ignore_ascii_case(needle))
    };
    match operator {
        Operator::Contains => {
            value.and_then(|v| v.as_str()).is_some_and(has)
        }
        Operator::NotContains => {
            value.and_then(|v| v.as_str()).is_some_and(|v| !has(v))
        }
        Operator::ContainsAny => value
            .is_some_and(|v| v.text_members().iter().any(|m| has(m))),
        Operator::ContainsAll => value
            .is_some_and(|v| v.text_members().iter().all(|m| has(m))),
        Operator::IsEmpty => actual.is_empty(),
        Operator::IsNotEmpty => !actual.is_empty(),
        _ => false,
    }
}
