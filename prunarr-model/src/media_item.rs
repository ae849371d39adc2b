use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media_type::MediaType;

/// Normalized evaluator input, assembled by a media-source adapter from one
/// upstream library record.
///
/// Absent upstream attributes stay `None`; the evaluator's null-safety
/// rules decide what an absent value means per operator. Timestamps are
/// absolute UTC (upstream epoch seconds are converted at the adapter
/// boundary), sizes are bytes, bitrates kbps, durations seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Opaque Plex identifier; may be absent upstream, in which case the
    /// orchestrator synthesizes a candidate key.
    pub plex_rating_key: Option<String>,
    pub title: String,
    #[serde(default)]
    pub play_count: i64,
    pub year: Option<i32>,
    pub library_id: Option<String>,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    pub file_size: Option<i64>,
    pub file_path: Option<String>,
    pub duration: Option<i64>,
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub container: Option<String>,
    pub bitrate: Option<i64>,
    pub rating: Option<f64>,
    pub audience_rating: Option<f64>,
    pub content_rating: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub poster: Option<String>,
    pub radarr_id: Option<i64>,
    pub sonarr_id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub tvdb_id: Option<i64>,
    pub radarr: Option<RadarrInfo>,
    pub sonarr: Option<SonarrInfo>,
}

impl MediaItem {
    /// External catalog-service id used for deletion, by media type.
    pub fn external_id(&self, media_type: MediaType) -> Option<i64> {
        match media_type {
            MediaType::Movie => self.radarr_id,
            MediaType::TvSeries => self.sonarr_id,
        }
    }
}

/// Movie-manager sub-record (`radarr.*` fields).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrInfo {
    pub has_file: Option<bool>,
    pub monitored: Option<bool>,
    pub quality_profile_id: Option<i64>,
    pub minimum_availability: Option<String>,
}

/// Series-manager sub-record (`sonarr.*` fields).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrInfo {
    pub monitored: Option<bool>,
    pub status: Option<String>,
    pub episode_file_count: Option<i64>,
    pub percent_of_episodes: Option<f64>,
}
