//! Adapters over the external catalog services.
//!
//! The engine never speaks HTTP itself: the movie and series managers are
//! external collaborators reached through the [`MovieManagerApi`] and
//! [`SeriesManagerApi`] role traits, which return raw wire records. The
//! adapters normalize those records into [`MediaItem`]s (epoch seconds to
//! absolute timestamps, absent stays absent) and expose the uniform
//! [`MediaSource`] interface the scanner and executor consume.

mod movies;
mod series;
mod wire;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use prunarr_model::{MediaItem, MediaType};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use movies::{MovieManagerApi, MovieSource};
pub use series::{SeriesManagerApi, SeriesSource};
pub use wire::{MovieRecord, SeriesRecord, WireMediaInfo};

/// Upstream fetches are paged; one page covers a full library section.
pub const LIBRARY_PAGE_LIMIT: usize = 10_000;

/// One library section of an upstream service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRef {
    pub id: String,
    pub name: String,
}

/// Uniform interface over one external library service.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn media_type(&self) -> MediaType;

    /// Short tag used when synthesizing candidate keys (`radarr`,
    /// `sonarr`).
    fn source_key(&self) -> &'static str;

    /// Configured instance name, recorded in audit rows.
    fn instance_name(&self) -> &str;

    async fn list_libraries(&self) -> Result<Vec<LibraryRef>>;

    async fn fetch_items(
        &self,
        library: &LibraryRef,
        page_limit: usize,
    ) -> Result<Vec<MediaItem>>;

    async fn delete_media(
        &self,
        external_id: i64,
        delete_files: bool,
    ) -> Result<()>;
}

/// Resolves the adapter for a media type. Slots are optional: a
/// deployment may only manage movies, only series, or both.
#[derive(Clone, Default)]
pub struct SourceSet {
    movie: Option<Arc<dyn MediaSource>>,
    series: Option<Arc<dyn MediaSource>>,
}

impl SourceSet {
    pub fn new(
        movie: Option<Arc<dyn MediaSource>>,
        series: Option<Arc<dyn MediaSource>>,
    ) -> Self {
        Self { movie, series }
    }

    pub fn with_movies(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.movie = Some(source);
        self
    }

    pub fn with_series(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.series = Some(source);
        self
    }

    pub fn get(&self, media_type: MediaType) -> Option<&Arc<dyn MediaSource>> {
        match media_type {
            MediaType::Movie => self.movie.as_ref(),
            MediaType::TvSeries => self.series.as_ref(),
        }
    }

    /// Label used in "no configured instance" errors.
    pub fn service_label(media_type: MediaType) -> &'static str {
        match media_type {
            MediaType::Movie => "Radarr",
            MediaType::TvSeries => "Sonarr",
        }
    }
}

impl fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSet")
            .field("movie", &self.movie.as_ref().map(|s| s.instance_name().to_string()))
            .field("series", &self.series.as_ref().map(|s| s.instance_name().to_string()))
            .finish()
    }
}
