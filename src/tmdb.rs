use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::media::{ItemId, Media, MediaKind, MetadataError, MetadataProvider};

// Set TMDB_API_KEY at compile time to embed a key; otherwise it must come from config
const EMBEDDED_API_KEY: Option<&str> = option_env!("TMDB_API_KEY");

#[derive(Debug, Clone, Deserialize)]
pub struct FindResult {
    pub id: u64,
    pub title: Option<String>, // Movies
    pub name: Option<String>,  // TV shows
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
}

impl FindResult {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn year(&self) -> Option<u16> {
        let date = self
            .release_date
            .as_deref()
            .or(self.first_air_date.as_deref())?;
        date.split('-').next()?.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    movie_results: Vec<FindResult>,
    #[serde(default)]
    tv_results: Vec<FindResult>,
}

pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl TmdbClient {
    /// Create a new TMDB client. Uses custom key if provided, otherwise tries embedded key.
    /// Returns None if no API key is available.
    pub fn new(client: Client, custom_api_key: Option<&str>, language: &str) -> Option<Self> {
        Self::with_base_url(client, custom_api_key, language, "https://api.themoviedb.org")
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(
        client: Client,
        custom_api_key: Option<&str>,
        language: &str,
        base_url: &str,
    ) -> Option<Self> {
        let api_key = custom_api_key
            .map(String::from)
            .or_else(|| EMBEDDED_API_KEY.map(String::from))?;

        Some(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    /// Look up TMDB entries by IMDB id
    pub async fn find_by_imdb(
        &self,
        imdb_id: &str,
        kind: MediaKind,
    ) -> Result<Vec<FindResult>, MetadataError> {
        let url = format!(
            "{}/3/find/{}?api_key={}&external_source=imdb_id&language={}",
            self.base_url,
            urlencoding::encode(imdb_id),
            self.api_key,
            self.language
        );

        debug!(imdb_id, %kind, "looking up TMDB id");

        let response: FindResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match kind {
            MediaKind::Movie => response.movie_results,
            MediaKind::Series => response.tv_results,
        })
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn get_metadata(&self, item_id: &str, kind: MediaKind) -> Result<Media, MetadataError> {
        let id = ItemId::parse(item_id)?;

        if kind == MediaKind::Series && id.season.is_none() {
            return Err(MetadataError::InvalidId(item_id.to_string()));
        }

        let found = self
            .find_by_imdb(&id.external_id, kind)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MetadataError::NotFound(id.external_id.clone()))?;

        debug!(
            tmdb_id = found.id,
            title = found.display_title(),
            year = ?found.year(),
            "resolved metadata"
        );

        Ok(Media {
            id: found.id.to_string(),
            kind,
            season: id.season,
            episode: id.episode,
        })
    }
}
