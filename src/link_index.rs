use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::media::{Media, MediaKind};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read index: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse index: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("missing {0} for series lookup")]
    MissingEpisode(&'static str),
    #[error("link is not indexed: {0}")]
    NotIndexed(String),
}

/// Static catalogue of hoster links, plus the table of links that were
/// rewritten for restricted hosts.
#[async_trait]
pub trait LinkIndex: Send + Sync {
    async fn search(&self, media: &Media) -> Result<Vec<String>, IndexError>;

    /// Whether `link` has a row in the catalogue. Only indexed links can
    /// carry a rewrite.
    async fn contains(&self, link: &str) -> Result<bool, IndexError>;

    async fn get_rewrite(&self, link: &str) -> Result<Option<String>, IndexError>;

    async fn set_rewrite(&self, link: &str, replacement: &str) -> Result<(), IndexError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDump {
    #[serde(default)]
    pub movies: Vec<MovieRow>,
    #[serde(default)]
    pub episodes: Vec<EpisodeRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRow {
    pub tmdb: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRow {
    pub tmdb: String,
    pub season: u32,
    pub episode: u32,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,
}

/// In-process link index built from a JSON dump.
pub struct MemoryLinkIndex {
    dump: IndexDump,
    movies: HashMap<String, Vec<String>>,
    episodes: HashMap<(String, u32, u32), Vec<String>>,
    indexed: HashSet<String>,
    rewrites: RwLock<HashMap<String, String>>,
}

impl MemoryLinkIndex {
    pub fn new(dump: IndexDump) -> Self {
        let mut movies: HashMap<String, Vec<String>> = HashMap::new();
        let mut episodes: HashMap<(String, u32, u32), Vec<String>> = HashMap::new();
        let mut rewrites = HashMap::new();

        for row in &dump.movies {
            movies.entry(row.tmdb.clone()).or_default().push(row.link.clone());
            if let Some(ref rewrite) = row.rewrite {
                rewrites.insert(row.link.clone(), rewrite.clone());
            }
        }

        for row in &dump.episodes {
            episodes
                .entry((row.tmdb.clone(), row.season, row.episode))
                .or_default()
                .push(row.link.clone());
            if let Some(ref rewrite) = row.rewrite {
                rewrites.insert(row.link.clone(), rewrite.clone());
            }
        }

        let indexed = dump
            .movies
            .iter()
            .map(|row| row.link.clone())
            .chain(dump.episodes.iter().map(|row| row.link.clone()))
            .collect();

        Self {
            dump,
            movies,
            episodes,
            indexed,
            rewrites: RwLock::new(rewrites),
        }
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let contents = std::fs::read_to_string(path)?;
        let dump: IndexDump = serde_json::from_str(&contents)?;
        info!(
            movies = dump.movies.len(),
            episodes = dump.episodes.len(),
            "loaded link index"
        );
        Ok(Self::new(dump))
    }

    /// Write the index back to disk with every recorded rewrite applied.
    pub async fn save(&self, path: &Path) -> Result<(), IndexError> {
        let dump = self.snapshot().await;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&dump)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "saved link index");
        Ok(())
    }

    pub async fn snapshot(&self) -> IndexDump {
        let rewrites = self.rewrites.read().await;
        let mut dump = self.dump.clone();

        for row in &mut dump.movies {
            row.rewrite = rewrites.get(&row.link).cloned();
        }
        for row in &mut dump.episodes {
            row.rewrite = rewrites.get(&row.link).cloned();
        }

        dump
    }

    pub fn len(&self) -> usize {
        self.dump.movies.len() + self.dump.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LinkIndex for MemoryLinkIndex {
    async fn search(&self, media: &Media) -> Result<Vec<String>, IndexError> {
        let links = match media.kind {
            MediaKind::Movie => self.movies.get(&media.id),
            MediaKind::Series => {
                let season = media.season.ok_or(IndexError::MissingEpisode("season"))?;
                let episode = media.episode.ok_or(IndexError::MissingEpisode("episode"))?;
                self.episodes.get(&(media.id.clone(), season, episode))
            }
        };

        Ok(links.cloned().unwrap_or_default())
    }

    async fn contains(&self, link: &str) -> Result<bool, IndexError> {
        Ok(self.indexed.contains(link))
    }

    async fn get_rewrite(&self, link: &str) -> Result<Option<String>, IndexError> {
        Ok(self.rewrites.read().await.get(link).cloned())
    }

    async fn set_rewrite(&self, link: &str, replacement: &str) -> Result<(), IndexError> {
        if !self.indexed.contains(link) {
            return Err(IndexError::NotIndexed(link.to_string()));
        }
        self.rewrites
            .write()
            .await
            .insert(link.to_string(), replacement.to_string());
        Ok(())
    }
}
