use std::fmt::Display;
use std::fmt::Formatter;

/// Media types the maintenance engine operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    /// Movie media type, managed by the movie catalog service
    Movie,
    /// Series media type, managed by the series catalog service
    TvSeries,
}

impl MediaType {
    pub fn all() -> &'static [MediaType] {
        &[MediaType::Movie, MediaType::TvSeries]
    }

    /// Stable wire/storage encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "MOVIE",
            MediaType::TvSeries => "TV_SERIES",
        }
    }

    pub fn decode(value: &str) -> Option<MediaType> {
        match value {
            "MOVIE" => Some(MediaType::Movie),
            "TV_SERIES" => Some(MediaType::TvSeries),
            _ => None,
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
