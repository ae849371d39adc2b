//! Raw records as returned by the catalog-service clients.
//!
//! Timestamps are upstream epoch seconds, sizes are bytes, bitrates kbps.
//! Everything the upstream may omit is optional; normalization keeps
//! absence rather than substituting zeroes.

use serde::Deserialize;

/// Media-file details shared by both services.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMediaInfo {
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub container: Option<String>,
    /// Overall bitrate in kbps.
    pub bitrate: Option<i64>,
    /// Runtime in seconds.
    pub runtime: Option<i64>,
}

/// One movie as reported by the movie manager, enriched with Plex and
/// watch-history attributes by the upstream aggregation layer.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub plex_rating_key: Option<String>,
    pub tmdb_id: Option<i64>,
    /// Epoch seconds when the item entered the library.
    pub added: Option<i64>,
    /// Epoch seconds of the most recent watch.
    pub last_watched: Option<i64>,
    pub play_count: Option<i64>,
    pub size_on_disk: Option<i64>,
    pub path: Option<String>,
    pub poster: Option<String>,
    pub rating: Option<f64>,
    pub audience_rating: Option<f64>,
    pub content_rating: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub has_file: Option<bool>,
    pub monitored: Option<bool>,
    pub quality_profile_id: Option<i64>,
    pub minimum_availability: Option<String>,
    pub media_info: Option<WireMediaInfo>,
}

/// One series as reported by the series manager.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRecord {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub plex_rating_key: Option<String>,
    pub tvdb_id: Option<i64>,
    pub added: Option<i64>,
    pub last_watched: Option<i64>,
    pub play_count: Option<i64>,
    pub size_on_disk: Option<i64>,
    pub path: Option<String>,
    pub poster: Option<String>,
    pub rating: Option<f64>,
    pub audience_rating: Option<f64>,
    pub content_rating: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub monitored: Option<bool>,
    pub status: Option<String>,
    pub episode_file_count: Option<i64>,
    pub percent_of_episodes: Option<f64>,
    pub media_info: Option<WireMediaInfo>,
}
