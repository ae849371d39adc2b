//! Hierarchical AND/OR predicate trees attached to maintenance rules.
//!
//! Criteria are persisted as JSON. The current shape is a tagged tree whose
//! root is always a group; older rules persisted a flat bag of named
//! predicates, which [`GroupNode::from_value`] migrates in memory before
//! evaluation (persisted rules are never rewritten).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::operator::Operator;

/// Boolean combinator of a group node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }
}

/// Unit qualifier for relative-date comparisons.
///
/// Months and years are fixed 30/365-day approximations so that one scan
/// produces the same thresholds regardless of calendar position.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueUnit {
    Days,
    Months,
    Years,
}

impl ValueUnit {
    pub fn days_factor(&self) -> i64 {
        match self {
            ValueUnit::Days => 1,
            ValueUnit::Months => 30,
            ValueUnit::Years => 365,
        }
    }

    fn decode(value: &str) -> Option<ValueUnit> {
        match value.to_ascii_lowercase().as_str() {
            "days" | "day" => Some(ValueUnit::Days),
            "months" | "month" => Some(ValueUnit::Months),
            "years" | "year" => Some(ValueUnit::Years),
            _ => None,
        }
    }
}

/// Comparison value of a condition: a scalar or a list of scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<ConditionValue>),
}

impl ConditionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConditionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConditionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConditionValue]> {
        match self {
            ConditionValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Flattens a scalar-or-list value into its textual members.
    pub fn text_members(&self) -> Vec<&str> {
        match self {
            ConditionValue::Text(s) => vec![s.as_str()],
            ConditionValue::List(items) => {
                items.iter().filter_map(|v| v.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Leaf node: one typed field comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    pub id: String,
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_unit: Option<ValueUnit>,
}

/// Inner node: AND/OR over child nodes.
///
/// The root group additionally carries the rule-level library selection;
/// inner groups leave it empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    pub id: String,
    pub operator: GroupOperator,
    pub conditions: Vec<CriteriaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub library_ids: Vec<String>,
}

/// A node of the predicate tree, discriminated by the `type` JSON field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CriteriaNode {
    Group(GroupNode),
    Condition(ConditionNode),
}

impl GroupNode {
    /// Parses persisted criteria JSON, migrating the legacy flat-bag shape
    /// when the root carries no `type` marker.
    pub fn from_value(value: Value) -> Result<GroupNode> {
        let Some(object) = value.as_object() else {
            return Err(ModelError::InvalidCriteria(
                "criteria root must be a JSON object".to_string(),
            ));
        };

        if object.contains_key("type") {
            match serde_json::from_value::<CriteriaNode>(value)? {
                CriteriaNode::Group(group) => Ok(group),
                // The root is a group by contract; tolerate a stray root
                // condition by wrapping it.
                CriteriaNode::Condition(condition) => Ok(GroupNode {
                    id: "root".to_string(),
                    operator: GroupOperator::And,
                    conditions: vec![CriteriaNode::Condition(condition)],
                    library_ids: Vec::new(),
                }),
            }
        } else {
            let legacy: LegacyCriteria = serde_json::from_value(value)?;
            Ok(legacy.migrate())
        }
    }

    /// Walks the tree and reports its size metrics with a coarse label the
    /// rule builder uses to warn about unwieldy rules.
    pub fn complexity(&self) -> CriteriaComplexity {
        fn walk(
            group: &GroupNode,
            depth: usize,
            acc: &mut CriteriaComplexity,
        ) {
            acc.group_count += 1;
            acc.max_depth = acc.max_depth.max(depth);
            for child in &group.conditions {
                match child {
                    CriteriaNode::Group(inner) => walk(inner, depth + 1, acc),
                    CriteriaNode::Condition(_) => acc.condition_count += 1,
                }
            }
        }

        let mut metrics = CriteriaComplexity {
            condition_count: 0,
            group_count: 0,
            max_depth: 0,
            label: ComplexityLabel::Simple,
        };
        walk(self, 1, &mut metrics);
        metrics.label = ComplexityLabel::classify(
            metrics.condition_count,
            metrics.max_depth,
        );
        metrics
    }
}

/// Size metrics of a predicate tree. UI-advisory only; never consulted
/// during evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct CriteriaComplexity {
    pub condition_count: usize,
    pub group_count: usize,
    pub max_depth: usize,
    pub label: ComplexityLabel,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLabel {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityLabel {
    fn classify(condition_count: usize, max_depth: usize) -> ComplexityLabel {
        if condition_count > 10 || max_depth > 3 {
            ComplexityLabel::Complex
        } else if condition_count > 5 || max_depth > 2 {
            ComplexityLabel::Moderate
        } else {
            ComplexityLabel::Simple
        }
    }
}

/// Legacy flat criteria bag predating the hierarchical builder.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCriteria {
    #[serde(default)]
    never_watched: Option<bool>,
    #[serde(default)]
    max_play_count: Option<f64>,
    #[serde(default)]
    last_watched_before: Option<LegacyAmount>,
    #[serde(default)]
    min_file_size: Option<LegacyAmount>,
    #[serde(default)]
    library_ids: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    operator: Option<GroupOperator>,
}

#[derive(Clone, Debug, Deserialize)]
struct LegacyAmount {
    value: f64,
    unit: String,
}

impl LegacyAmount {
    fn size_bytes(&self) -> f64 {
        let factor: f64 = match self.unit.to_ascii_lowercase().as_str() {
            "kb" => 1024.0,
            "mb" => 1024.0 * 1024.0,
            "gb" => 1024.0 * 1024.0 * 1024.0,
            "tb" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
            _ => 1.0,
        };
        self.value * factor
    }
}

impl LegacyCriteria {
    /// One-to-one mapping of named predicates to conditions under a single
    /// root group. Migrated node ids are deterministic so repeated loads of
    /// the same rule produce the same tree.
    fn migrate(self) -> GroupNode {
        let mut conditions = Vec::new();

        if let Some(true) = self.never_watched {
            conditions.push(condition(
                "legacy-never-watched",
                "neverWatched",
                Operator::Equals,
                Some(ConditionValue::Bool(true)),
                None,
            ));
        }

        if let Some(max) = self.max_play_count {
            conditions.push(condition(
                "legacy-max-play-count",
                "playCount",
                Operator::Le,
                Some(ConditionValue::Number(max)),
                None,
            ));
        }

        if let Some(watched) = &self.last_watched_before {
            conditions.push(condition(
                "legacy-last-watched-before",
                "lastWatchedAt",
                Operator::OlderThan,
                Some(ConditionValue::Number(watched.value)),
                Some(
                    ValueUnit::decode(&watched.unit)
                        .unwrap_or(ValueUnit::Days),
                ),
            ));
        }

        if let Some(size) = &self.min_file_size {
            conditions.push(condition(
                "legacy-min-file-size",
                "fileSize",
                Operator::Ge,
                Some(ConditionValue::Number(size.size_bytes())),
                None,
            ));
        }

        if !self.library_ids.is_empty() {
            conditions.push(condition(
                "legacy-library-ids",
                "libraryId",
                Operator::In,
                Some(ConditionValue::List(
                    self.library_ids
                        .iter()
                        .map(|id| ConditionValue::Text(id.clone()))
                        .collect(),
                )),
                None,
            ));
        }

        if !self.tags.is_empty() {
            conditions.push(condition(
                "legacy-tags",
                "labels",
                Operator::ContainsAny,
                Some(ConditionValue::List(
                    self.tags
                        .iter()
                        .map(|tag| ConditionValue::Text(tag.clone()))
                        .collect(),
                )),
                None,
            ));
        }

        GroupNode {
            id: "legacy-root".to_string(),
            operator: self.operator.unwrap_or(GroupOperator::And),
            conditions,
            library_ids: self.library_ids,
        }
    }
}

fn condition(
    id: &str,
    field: &str,
    operator: Operator,
    value: Option<ConditionValue>,
    value_unit: Option<ValueUnit>,
) -> CriteriaNode {
    CriteriaNode::Condition(ConditionNode {
        id: id.to_string(),
        field: field.to_string(),
        operator,
        value,
        value_unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_tree_round_trips() {
        let tree = GroupNode {
            id: "root".to_string(),
            operator: GroupOperator::Or,
            conditions: vec![
                CriteriaNode::Condition(ConditionNode {
                    id: "c1".to_string(),
                    field: "playCount".to_string(),
                    operator: Operator::Equals,
                    value: Some(ConditionValue::Number(0.0)),
                    value_unit: None,
                }),
                CriteriaNode::Group(GroupNode {
                    id: "g1".to_string(),
                    operator: GroupOperator::And,
                    conditions: vec![],
                    library_ids: Vec::new(),
                }),
            ],
            library_ids: vec!["1".to_string()],
        };

        let encoded = serde_json::to_value(CriteriaNode::Group(tree.clone()))
            .expect("serialize tree");
        assert_eq!(encoded["type"], "group");
        assert_eq!(encoded["conditions"][0]["type"], "condition");

        let decoded = GroupNode::from_value(encoded).expect("parse tree");
        assert_eq!(decoded, tree);
    }

    #[test]
    fn legacy_bag_migrates_to_root_group() {
        let legacy = json!({
            "neverWatched": true,
            "maxPlayCount": 2,
            "lastWatchedBefore": { "value": 6, "unit": "months" },
            "minFileSize": { "value": 2, "unit": "GB" },
            "libraryIds": ["1", "5"],
            "tags": ["keep-forever"],
            "operator": "OR"
        });

        let tree = GroupNode::from_value(legacy).expect("migrate legacy");
        assert_eq!(tree.operator, GroupOperator::Or);
        assert_eq!(tree.library_ids, vec!["1", "5"]);
        assert_eq!(tree.conditions.len(), 6);

        let fields: Vec<&str> = tree
            .conditions
            .iter()
            .map(|node| match node {
                CriteriaNode::Condition(c) => c.field.as_str(),
                CriteriaNode::Group(_) => "group",
            })
            .collect();
        assert_eq!(
            fields,
            vec![
                "neverWatched",
                "playCount",
                "lastWatchedAt",
                "fileSize",
                "libraryId",
                "labels"
            ]
        );

        let Some(CriteriaNode::Condition(watched)) = tree
            .conditions
            .iter()
            .find(|n| matches!(n, CriteriaNode::Condition(c) if c.field == "lastWatchedAt"))
        else {
            panic!("missing migrated lastWatchedAt condition");
        };
        assert_eq!(watched.operator, Operator::OlderThan);
        assert_eq!(watched.value_unit, Some(ValueUnit::Months));

        let Some(CriteriaNode::Condition(size)) = tree
            .conditions
            .iter()
            .find(|n| matches!(n, CriteriaNode::Condition(c) if c.field == "fileSize"))
        else {
            panic!("missing migrated fileSize condition");
        };
        assert_eq!(
            size.value.as_ref().and_then(|v| v.as_f64()),
            Some(2.0 * 1024.0 * 1024.0 * 1024.0)
        );
    }

    #[test]
    fn legacy_defaults_to_and_root() {
        let tree = GroupNode::from_value(json!({ "maxPlayCount": 1 }))
            .expect("migrate minimal legacy bag");
        assert_eq!(tree.operator, GroupOperator::And);
        assert_eq!(tree.conditions.len(), 1);
        assert!(tree.library_ids.is_empty());
    }

    #[test]
    fn root_condition_is_wrapped_in_a_group() {
        let tree = GroupNode::from_value(json!({
            "type": "condition",
            "id": "c1",
            "field": "playCount",
            "operator": "equals",
            "value": 0
        }))
        .expect("wrap stray root condition");
        assert_eq!(tree.operator, GroupOperator::And);
        assert_eq!(tree.conditions.len(), 1);
    }

    #[test]
    fn non_object_criteria_is_rejected() {
        assert!(GroupNode::from_value(json!([1, 2, 3])).is_err());
        assert!(GroupNode::from_value(json!("criteria")).is_err());
    }

    #[test]
    fn complexity_thresholds() {
        fn leaf(i: usize) -> CriteriaNode {
            CriteriaNode::Condition(ConditionNode {
                id: format!("c{i}"),
                field: "playCount".to_string(),
                operator: Operator::Equals,
                value: Some(ConditionValue::Number(0.0)),
                value_unit: None,
            })
        }

        let flat = GroupNode {
            id: "root".to_string(),
            operator: GroupOperator::And,
            conditions: (0..3).map(leaf).collect(),
            library_ids: Vec::new(),
        };
        let metrics = flat.complexity();
        assert_eq!(metrics.condition_count, 3);
        assert_eq!(metrics.group_count, 1);
        assert_eq!(metrics.max_depth, 1);
        assert_eq!(metrics.label, ComplexityLabel::Simple);

        let busy = GroupNode {
            conditions: (0..6).map(leaf).collect(),
            ..flat.clone()
        };
        assert_eq!(busy.complexity().label, ComplexityLabel::Moderate);

        let nested = GroupNode {
            id: "root".to_string(),
            operator: GroupOperator::And,
            conditions: vec![CriteriaNode::Group(GroupNode {
                id: "g1".to_string(),
                operator: GroupOperator::Or,
                conditions: vec![CriteriaNode::Group(GroupNode {
                    id: "g2".to_string(),
                    operator: GroupOperator::And,
                    conditions: vec![CriteriaNode::Group(GroupNode {
                        id: "g3".to_string(),
                        operator: GroupOperator::And,
                        conditions: vec![leaf(0)],
                        library_ids: Vec::new(),
                    })],
                    library_ids: Vec::new(),
                })],
                library_ids: Vec::new(),
            })],
            library_ids: Vec::new(),
        };
        let metrics = nested.complexity();
        assert_eq!(metrics.max_depth, 4);
        assert_eq!(metrics.label, ComplexityLabel::Complex);

        let wide = GroupNode {
            conditions: (0..11).map(leaf).collect(),
            ..flat
        };
        assert_eq!(wide.complexity().label, ComplexityLabel::Complex);
    }
}
