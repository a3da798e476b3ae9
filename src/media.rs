use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("invalid media id: {0}")]
    InvalidId(String),
    #[error("unknown media kind: {0}")]
    UnknownKind(String),
    #[error("no results found for {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl FromStr for MediaKind {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "series" | "tv" => Ok(Self::Series),
            other => Err(MetadataError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
        }
    }
}

/// Canonical identity of the requested item, as the link index knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub id: String,
    pub kind: MediaKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl Media {
    pub fn movie(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }
}

/// Client-facing item id: `tt0133093` for movies, `tt0903747:1:2` for
/// episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemId {
    pub external_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl ItemId {
    pub fn parse(raw: &str) -> Result<Self, MetadataError> {
        let raw = raw.trim_end_matches(".json");
        let mut parts = raw.split(':');

        let external_id = parts
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| MetadataError::InvalidId(raw.to_string()))?
            .to_string();

        let number = |part: Option<&str>| -> Result<Option<u32>, MetadataError> {
            part.map(|p| p.parse().map_err(|_| MetadataError::InvalidId(raw.to_string())))
                .transpose()
        };
        let season = number(parts.next())?;
        let episode = number(parts.next())?;

        if season.is_some() != episode.is_some() || parts.next().is_some() {
            return Err(MetadataError::InvalidId(raw.to_string()));
        }

        Ok(Self {
            external_id,
            season,
            episode,
        })
    }
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn get_metadata(&self, item_id: &str, kind: MediaKind) -> Result<Media, MetadataError>;
}
