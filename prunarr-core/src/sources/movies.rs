use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prunarr_model::{MediaItem, MediaType, RadarrInfo};
use tracing::debug;

use super::wire::MovieRecord;
use super::{LibraryRef, MediaSource};
use crate::error::Result;

/// Role interface of the movie manager's HTTP client, implemented outside
/// the engine.
#[async_trait]
pub trait MovieManagerApi: Send + Sync {
    async fn list_libraries(&self) -> Result<Vec<LibraryRef>>;

    /// One page of movies for a library section, at most `limit` records.
    async fn fetch_library_page(
        &self,
        library_id: &str,
        limit: usize,
    ) -> Result<Vec<MovieRecord>>;

    async fn delete_movie(&self, movie_id: i64, delete_files: bool)
    -> Result<()>;
}

/// Movie-side [`MediaSource`], normalizing manager records into
/// [`MediaItem`]s.
pub struct MovieSource {
    api: Arc<dyn MovieManagerApi>,
    instance_name: String,
}

impl MovieSource {
    pub fn new(api: Arc<dyn MovieManagerApi>, instance_name: impl Into<String>) -> Self {
        Self {
            api,
            instance_name: instance_name.into(),
        }
    }
}

impl std::fmt::Debug for MovieSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieSource")
            .field("instance_name", &self.instance_name)
            .finish()
    }
}

#[async_trait]
impl MediaSource for MovieSource {
    fn media_type(&self) -> MediaType {
        MediaType::Movie
    }

    fn source_key(&self) -> &'static str {
        "radarr"
    }

    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    async fn list_libraries(&self) -> Result<Vec<LibraryRef>> {
        self.api.list_libraries().await
    }

    async fn fetch_items(
        &self,
        library: &LibraryRef,
        page_limit: usize,
    ) -> Result<Vec<MediaItem>> {
        let records = self
            .api
            .fetch_library_page(&library.id, page_limit)
            .await?;
        debug!(
            library = %library.id,
            count = records.len(),
            "fetched movie library page"
        );
        Ok(records
            .into_iter()
            .map(|record| movie_item(record, &library.id))
            .collect())
    }

    async fn delete_media(
        &self,
        external_id: i64,
        delete_files: bool,
    ) -> Result<()> {
        self.api.delete_movie(external_id, delete_files).await
    }
}

pub(super) fn epoch(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn movie_item(record: MovieRecord, library_id: &str) -> MediaItem {
    let media_info = record.media_info.unwrap_or_default();
    MediaItem {
        plex_rating_key: record.plex_rating_key,
        title: record.title,
        play_count: record.play_count.unwrap_or(0),
        year: record.year,
        library_id: Some(library_id.to_string()),
        last_watched_at: epoch(record.last_watched),
        added_at: epoch(record.added),
        file_size: record.size_on_disk,
        file_path: record.path,
        duration: media_info.runtime,
        resolution: media_info.resolution,
        video_codec: media_info.video_codec,
        audio_codec: media_info.audio_codec,
        container: media_info.container,
        bitrate: media_info.bitrate,
        rating: record.rating,
        audience_rating: record.audience_rating,
        content_rating: record.content_rating,
        genres: record.genres,
        labels: record.tags,
        poster: record.poster,
        radarr_id: Some(record.id),
        sonarr_id: None,
        tmdb_id: record.tmdb_id,
        tvdb_id: None,
        radarr: Some(RadarrInfo {
            has_file: record.has_file,
            monitored: record.monitored,
            quality_profile_id: record.quality_profile_id,
            minimum_availability: record.minimum_availability,
        }),
        sonarr: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_converts_epochs_and_keeps_absence() {
        let record = MovieRecord {
            id: 42,
            title: "Stalker".to_string(),
            year: Some(1979),
            added: Some(1_609_459_200), // 2021-01-01T00:00:00Z
            size_on_disk: Some(7_000_000_000),
            ..MovieRecord::default()
        };
        let item = movie_item(record, "3");

        assert_eq!(item.library_id.as_deref(), Some("3"));
        assert_eq!(item.radarr_id, Some(42));
        assert_eq!(
            item.added_at.map(|ts| ts.timestamp()),
            Some(1_609_459_200)
        );
        // Absent upstream attributes stay absent, not zero.
        assert_eq!(item.last_watched_at, None);
        assert_eq!(item.bitrate, None);
        assert_eq!(item.play_count, 0);
        assert!(item.sonarr.is_none());
    }
}
