//! Process-global catalog of comparable fields.
//!
//! The catalog is closed: rules may only reference fields defined here,
//! which is what makes static rule validation, UI generation, and
//! evaluator dispatch by type (rather than by field name) possible.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use prunarr_model::{
    ConditionNode, CriteriaNode, DataSource, EnumValue, Field, FieldType,
    GroupNode, MediaType, Operator, Unit,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;

const BOTH: &[MediaType] = &[MediaType::Movie, MediaType::TvSeries];
const MOVIE_ONLY: &[MediaType] = &[MediaType::Movie];
const SERIES_ONLY: &[MediaType] = &[MediaType::TvSeries];

const LIBRARY_OPS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::In,
    Operator::NotIn,
];

// Ordered-enum fields keep ordinal operators; comparison falls back to
// string ordering of the enum value (so "720p" sorts after "1080p").
const ORDERED_ENUM_OPS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::In,
    Operator::NotIn,
    Operator::Gt,
    Operator::Ge,
    Operator::Lt,
    Operator::Le,
];

const ENUM_OPS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::In,
    Operator::NotIn,
];

const RESOLUTION_VALUES: &[EnumValue] = &[
    EnumValue { value: "sd", label: "SD" },
    EnumValue { value: "720p", label: "720p" },
    EnumValue { value: "1080p", label: "1080p" },
    EnumValue { value: "4k", label: "4K" },
];

const MINIMUM_AVAILABILITY_VALUES: &[EnumValue] = &[
    EnumValue { value: "announced", label: "Announced" },
    EnumValue { value: "inCinemas", label: "In Cinemas" },
    EnumValue { value: "released", label: "Released" },
];

const SERIES_STATUS_VALUES: &[EnumValue] = &[
    EnumValue { value: "continuing", label: "Continuing" },
    EnumValue { value: "ended", label: "Ended" },
    EnumValue { value: "upcoming", label: "Upcoming" },
    EnumValue { value: "deleted", label: "Deleted" },
];

/// The closed field catalog, in UI display order.
pub static FIELDS: &[Field] = &[
    Field {
        key: "title",
        label: "Title",
        description: "Item title as it appears in the library",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_strings(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "year",
        label: "Release year",
        description: "Original release year",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "libraryId",
        label: "Library",
        description: "Library section the item belongs to",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: LIBRARY_OPS,
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "addedAt",
        label: "Added to library",
        description: "When the item was added to the library",
        field_type: FieldType::Date,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_dates(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "playCount",
        label: "Play count",
        description: "Total recorded plays across all users",
        field_type: FieldType::Number,
        data_source: DataSource::Tautulli,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "lastWatchedAt",
        label: "Last watched",
        description: "Most recent watch across all users",
        field_type: FieldType::Date,
        data_source: DataSource::Tautulli,
        media_types: BOTH,
        allowed_operators: Operator::for_dates(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "neverWatched",
        label: "Never watched",
        description: "No recorded plays for any user",
        field_type: FieldType::Boolean,
        data_source: DataSource::Tautulli,
        media_types: BOTH,
        allowed_operators: Operator::for_booleans(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "daysSinceAdded",
        label: "Days since added",
        description: "Whole days since the item entered the library",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: Some(Unit::Days),
    },
    Field {
        key: "daysSinceWatched",
        label: "Days since last watch",
        description: "Whole days since the most recent watch",
        field_type: FieldType::Number,
        data_source: DataSource::Tautulli,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: Some(Unit::Days),
    },
    Field {
        key: "rating",
        label: "Critic rating",
        description: "Critic rating on a 0-10 scale",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "audienceRating",
        label: "Audience rating",
        description: "Audience rating on a 0-10 scale",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "contentRating",
        label: "Content rating",
        description: "Certification label such as PG-13 or TV-MA",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_strings(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "genres",
        label: "Genres",
        description: "Genre tags on the item",
        field_type: FieldType::Array,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_arrays(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "labels",
        label: "Labels",
        description: "Labels applied by library managers",
        field_type: FieldType::Array,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_arrays(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "fileSize",
        label: "File size",
        description: "Total size on disk",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: Some(Unit::Bytes),
    },
    Field {
        key: "filePath",
        label: "File path",
        description: "Path of the primary media file",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_strings(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "duration",
        label: "Duration",
        description: "Runtime of the primary media file",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: Some(Unit::Seconds),
    },
    Field {
        key: "resolution",
        label: "Resolution",
        description: "Video resolution class of the primary file",
        field_type: FieldType::Enum,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: ORDERED_ENUM_OPS,
        enum_values: RESOLUTION_VALUES,
        unit: None,
    },
    Field {
        key: "videoCodec",
        label: "Video codec",
        description: "Video codec of the primary file",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_strings(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "audioCodec",
        label: "Audio codec",
        description: "Audio codec of the primary file",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_strings(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "container",
        label: "Container",
        description: "Container format of the primary file",
        field_type: FieldType::String,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_strings(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "bitrate",
        label: "Bitrate",
        description: "Overall bitrate of the primary file",
        field_type: FieldType::Number,
        data_source: DataSource::Plex,
        media_types: BOTH,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: Some(Unit::Kbps),
    },
    Field {
        key: "radarr.hasFile",
        label: "Has file",
        description: "Movie has a downloaded file",
        field_type: FieldType::Boolean,
        data_source: DataSource::Radarr,
        media_types: MOVIE_ONLY,
        allowed_operators: Operator::for_booleans(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "radarr.monitored",
        label: "Monitored",
        description: "Movie is monitored for upgrades",
        field_type: FieldType::Boolean,
        data_source: DataSource::Radarr,
        media_types: MOVIE_ONLY,
        allowed_operators: Operator::for_booleans(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "radarr.qualityProfileId",
        label: "Quality profile",
        description: "Numeric id of the assigned quality profile",
        field_type: FieldType::Number,
        data_source: DataSource::Radarr,
        media_types: MOVIE_ONLY,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "radarr.minimumAvailability",
        label: "Minimum availability",
        description: "Availability gate before the movie is grabbed",
        field_type: FieldType::Enum,
        data_source: DataSource::Radarr,
        media_types: MOVIE_ONLY,
        allowed_operators: ENUM_OPS,
        enum_values: MINIMUM_AVAILABILITY_VALUES,
        unit: None,
    },
    Field {
        key: "sonarr.monitored",
        label: "Monitored",
        description: "Series is monitored for new episodes",
        field_type: FieldType::Boolean,
        data_source: DataSource::Sonarr,
        media_types: SERIES_ONLY,
        allowed_operators: Operator::for_booleans(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "sonarr.status",
        label: "Series status",
        description: "Airing status reported by the series manager",
        field_type: FieldType::Enum,
        data_source: DataSource::Sonarr,
        media_types: SERIES_ONLY,
        allowed_operators: ENUM_OPS,
        enum_values: SERIES_STATUS_VALUES,
        unit: None,
    },
    Field {
        key: "sonarr.episodeFileCount",
        label: "Episode files",
        description: "Number of downloaded episode files",
        field_type: FieldType::Number,
        data_source: DataSource::Sonarr,
        media_types: SERIES_ONLY,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
    Field {
        key: "sonarr.percentOfEpisodes",
        label: "Episode completion",
        description: "Percentage of aired episodes on disk",
        field_type: FieldType::Number,
        data_source: DataSource::Sonarr,
        media_types: SERIES_ONLY,
        allowed_operators: Operator::for_numbers(),
        enum_values: &[],
        unit: None,
    },
];

static FIELD_INDEX: Lazy<HashMap<&'static str, &'static Field>> =
    Lazy::new(|| FIELDS.iter().map(|field| (field.key, field)).collect());

/// Looks up a field by its stable key.
pub fn lookup(key: &str) -> Option<&'static Field> {
    FIELD_INDEX.get(key).copied()
}

/// All fields applicable to the given media type, in display order.
pub fn fields_for(media_type: MediaType) -> Vec<&'static Field> {
    FIELDS
        .iter()
        .filter(|field| field.applies_to(media_type))
        .collect()
}

/// Applicable fields grouped by their origin service, for UI sectioning.
pub fn fields_by_data_source(
    media_type: MediaType,
) -> HashMap<DataSource, Vec<&'static Field>> {
    let mut grouped: HashMap<DataSource, Vec<&'static Field>> = HashMap::new();
    for field in fields_for(media_type) {
        grouped.entry(field.data_source).or_default().push(field);
    }
    grouped
}

/// Human label for an operator, as shown in the rule builder.
pub fn format_operator(operator: Operator) -> &'static str {
    operator.label()
}

/// Short opaque id for freshly created tree nodes.
pub fn generate_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

/// One problem found while statically checking a predicate tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub node_id: String,
    pub field: String,
    pub message: String,
}

/// Statically validates a predicate tree against the catalog: unknown
/// fields, operators outside the field's allowed set, media-type
/// mismatches, and missing or misplaced `valueUnit` qualifiers.
///
/// Evaluation stays fail-safe regardless; this exists so rule saves can be
/// rejected with actionable messages.
pub fn validate_criteria(
    media_type: MediaType,
    tree: &GroupNode,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    walk_group(media_type, tree, &mut issues);
    issues
}

fn walk_group(
    media_type: MediaType,
    group: &GroupNode,
    issues: &mut Vec<ValidationIssue>,
) {
    for node in &group.conditions {
        match node {
            CriteriaNode::Group(inner) => {
                walk_group(media_type, inner, issues)
            }
            CriteriaNode::Condition(condition) => {
                check_condition(media_type, condition, issues)
            }
        }
    }
}

fn check_condition(
    media_type: MediaType,
    condition: &ConditionNode,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut push = |message: String| {
        issues.push(ValidationIssue {
            node_id: condition.id.clone(),
            field: condition.field.clone(),
            message,
        });
    };

    let Some(field) = lookup(&condition.field) else {
        push(format!("unknown field '{}'", condition.field));
        return;
    };

    if !field.applies_to(media_type) {
        push(format!(
            "field '{}' does not apply to {media_type}",
            field.key
        ));
    }

    if !field.allows(condition.operator) {
        push(format!(
            "operator '{}' is not allowed for field '{}'",
            condition.operator, field.key
        ));
    }

    let relative_date = field.field_type == FieldType::Date
        && condition.operator.is_relative_date();
    if relative_date && condition.value_unit.is_none() {
        push(format!(
            "operator '{}' requires a value unit of days, months, or years",
            condition.operator
        ));
    }
    if !relative_date && condition.value_unit.is_some() {
        push("value unit is only valid for olderThan/newerThan on a date field".to_string());
    }

    let needs_value = !matches!(
        condition.operator,
        Operator::IsNull
            | Operator::IsNotNull
            | Operator::IsEmpty
            | Operator::IsNotEmpty
    );
    if needs_value && condition.value.is_none() {
        push(format!(
            "operator '{}' requires a comparison value",
            condition.operator
        ));
    }
}
