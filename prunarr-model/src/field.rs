use std::fmt;

use serde::Serialize;

use crate::media_type::MediaType;
use crate::operator::Operator;

/// Value type of a registry field, driving evaluator dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date,
    Boolean,
    Array,
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Enum => "enum",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Origin service of a field's data. Used only for UI grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Plex,
    Tautulli,
    Radarr,
    Sonarr,
}

impl DataSource {
    pub fn all() -> &'static [DataSource] {
        use DataSource::*;
        &[Plex, Tautulli, Radarr, Sonarr]
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Plex => "Plex",
            DataSource::Tautulli => "Tautulli",
            DataSource::Radarr => "Radarr",
            DataSource::Sonarr => "Sonarr",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Canonical storage unit of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Bytes,
    Seconds,
    Minutes,
    Hours,
    Days,
    Kbps,
}

/// One selectable value of an enum field, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    pub value: &'static str,
    pub label: &'static str,
}

/// Immutable catalog entry describing one comparable attribute of a media
/// item. The full catalog is process-global and closed; rules may only
/// reference fields that exist here.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Field {
    /// Stable lookup key; dotted keys (`radarr.hasFile`) walk sub-records.
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub data_source: DataSource,
    pub media_types: &'static [MediaType],
    pub allowed_operators: &'static [Operator],
    pub enum_values: &'static [EnumValue],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Field {
    pub fn applies_to(&self, media_type: MediaType) -> bool {
        self.media_types.contains(&media_type)
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators.contains(&operator)
    }
}
