//! Field-value resolution against a normalized media item.

use chrono::{DateTime, Utc};
use prunarr_model::MediaItem;
use tracing::warn;

/// A resolved field value, typed for evaluator dispatch. `Absent` covers
/// missing attributes, broken dotted paths, and unknown keys alike.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Bool(bool),
    List(Vec<String>),
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

fn text(value: Option<&String>) -> FieldValue {
    value
        .map(|v| FieldValue::Text(v.clone()))
        .unwrap_or(FieldValue::Absent)
}

fn number(value: Option<f64>) -> FieldValue {
    value.map(FieldValue::Number).unwrap_or(FieldValue::Absent)
}

fn date(value: Option<DateTime<Utc>>) -> FieldValue {
    value.map(FieldValue::Date).unwrap_or(FieldValue::Absent)
}

fn boolean(value: Option<bool>) -> FieldValue {
    value.map(FieldValue::Bool).unwrap_or(FieldValue::Absent)
}

/// Resolves a registry key against an item. Flat keys read the matching
/// attribute, dotted keys walk sub-records, and the three virtual fields
/// are computed from primitive attributes relative to `now`.
pub fn resolve(item: &MediaItem, key: &str, now: DateTime<Utc>) -> FieldValue {
    match key {
        "title" => FieldValue::Text(item.title.clone()),
        "year" => number(item.year.map(f64::from)),
        "libraryId" => text(item.library_id.as_ref()),
        "addedAt" => date(item.added_at),
        "lastWatchedAt" => date(item.last_watched_at),
        "playCount" => FieldValue::Number(item.play_count as f64),
        "fileSize" => number(item.file_size.map(|v| v as f64)),
        "filePath" => text(item.file_path.as_ref()),
        "duration" => number(item.duration.map(|v| v as f64)),
        "resolution" => text(item.resolution.as_ref()),
        "videoCodec" => text(item.video_codec.as_ref()),
        "audioCodec" => text(item.audio_codec.as_ref()),
        "container" => text(item.container.as_ref()),
        "bitrate" => number(item.bitrate.map(|v| v as f64)),
        "rating" => number(item.rating),
        "audienceRating" => number(item.audience_rating),
        "contentRating" => text(item.content_rating.as_ref()),
        "genres" => FieldValue::List(item.genres.clone()),
        "labels" => FieldValue::List(item.labels.clone()),
        "neverWatched" => FieldValue::Bool(item.play_count == 0),
        "daysSinceAdded" => number(
            item.added_at.map(|ts| (now - ts).num_days() as f64),
        ),
        "daysSinceWatched" => number(
            item.last_watched_at.map(|ts| (now - ts).num_days() as f64),
        ),
        _ => {
            if let Some(sub) = key.strip_prefix("radarr.") {
                resolve_radarr(item, key, sub)
            } else if let Some(sub) = key.strip_prefix("sonarr.") {
                resolve_sonarr(item, key, sub)
            } else {
                warn!(field = key, "rule references unknown field");
                FieldValue::Absent
            }
        }
    }
}

fn resolve_radarr(item: &MediaItem, key: &str, sub: &str) -> FieldValue {
    let Some(radarr) = &item.radarr else {
        return FieldValue::Absent;
    };
    match sub {
        "hasFile" => boolean(radarr.has_file),
        "monitored" => boolean(radarr.monitored),
        "qualityProfileId" => {
            number(radarr.quality_profile_id.map(|v| v as f64))
        }
        "minimumAvailability" => text(radarr.minimum_availability.as_ref()),
        _ => {
            warn!(field = key, "rule references unknown field");
            FieldValue::Absent
        }
    }
}

fn resolve_sonarr(item: &MediaItem, key: &str, sub: &str) -> FieldValue {
    let Some(sonarr) = &item.sonarr else {
        return FieldValue::Absent;
    };
    match sub {
        "monitored" => boolean(sonarr.monitored),
        "status" => text(sonarr.status.as_ref()),
        "episodeFileCount" => {
            number(sonarr.episode_file_count.map(|v| v as f64))
        }
        "percentOfEpisodes" => number(sonarr.percent_of_episodes),
        _ => {
            warn!(field = key, "rule references unknown field");
            FieldValue::Absent
        }
    }
}
