use std::sync::Arc;

use async_trait::async_trait;
use prunarr_model::{MediaItem, MediaType, SonarrInfo};
use tracing::debug;

use super::movies::epoch;
use super::wire::SeriesRecord;
use super::{LibraryRef, MediaSource};
use crate::error::Result;

/// Role interface of the series manager's HTTP client.
#[async_trait]
pub trait SeriesManagerApi: Send + Sync {
    async fn list_libraries(&self) -> Result<Vec<LibraryRef>>;

    async fn fetch_library_page(
        &self,
        library_id: &str,
        limit: usize,
    ) -> Result<Vec<SeriesRecord>>;

    async fn delete_series(
        &self,
        series_id: i64,
        delete_files: bool,
    ) -> Result<()>;
}

/// Series-side [`MediaSource`].
pub struct SeriesSource {
    api: Arc<dyn SeriesManagerApi>,
    instance_name: String,
}

impl SeriesSource {
    pub fn new(
        api: Arc<dyn SeriesManagerApi>,
        instance_name: impl Into<String>,
    ) -> Self {
        Self {
            api,
            instance_name: instance_name.into(),
        }
    }
}

impl std::fmt::Debug for SeriesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesSource")
            .field("instance_name", &self.instance_name)
            .finish()
    }
}

#[async_trait]
impl MediaSource for SeriesSource {
    fn media_type(&self) -> MediaType {
        MediaType::TvSeries
    }

    fn source_key(&self) -> &'static str {
        "sonarr"
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
            "fetched series library page"
        );
        Ok(records
            .into_iter()
            .map(|record| series_item(record, &library.id))
            .collect())
    }

    async fn delete_media(
        &self,
        external_id: i64,
        delete_files: bool,
    ) -> Result<()> {
        self.api.delete_series(external_id, delete_files).await
    }
}

fn series_item(record: SeriesRecord, library_id: &str) -> MediaItem {
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
        radarr_id: None,
        sonarr_id: Some(record.id),
        tmdb_id: None,
        tvdb_id: record.tvdb_id,
        radarr: None,
        sonarr: Some(SonarrInfo {
            monitored: record.monitored,
            status: record.status,
            episode_file_count: record.episode_file_count,
            percent_of_episodes: record.percent_of_episodes,
        }),
    }
}
