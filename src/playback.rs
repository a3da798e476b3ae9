use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::cache::ResolutionCache;
use crate::candidate::UNKNOWN_FILE_NAME;
use crate::debrid::{DebridContext, DebridResolver};
use crate::encoding::{self, EncodingError};
use crate::user_config::{UserConfig, UserConfigError};

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("query is required")]
    MissingQuery,
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] UserConfigError),
    #[error("invalid link segment: {0}")]
    InvalidLink(#[from] EncodingError),
    #[error("unable to produce a playable link for {0}")]
    Unresolvable(String),
}

/// Serves playback requests from the resolution cache, falling back to a
/// synchronous resolution of the single requested link. Never writes the
/// cache.
pub struct PlaybackResolver {
    cache: Arc<ResolutionCache>,
    debrid: DebridContext,
}

impl PlaybackResolver {
    pub fn new(cache: Arc<ResolutionCache>, debrid: DebridContext) -> Self {
        Self { cache, debrid }
    }

    pub async fn resolve(
        &self,
        config: &UserConfig,
        encoded_file_name: &str,
        encoded_link: &str,
    ) -> Result<String, PlaybackError> {
        if encoded_link.is_empty() {
            return Err(PlaybackError::MissingQuery);
        }

        let start = Instant::now();

        if let Some(entry) = self.cache.get(encoded_link, config).await {
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "playback served from cache"
            );
            return Ok(entry.final_link);
        }

        info!("playback not cached, resolving now");
        let link = encoding::decode(encoded_link)?;
        let file_name = match encoding::decode(encoded_file_name) {
            Ok(name) if !name.is_empty() && name != UNKNOWN_FILE_NAME => Some(name),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable file name");
                None
            }
        };

        let resolver = DebridResolver::for_config(config, &self.debrid);
        match resolver.resolve(&link, file_name.as_deref()).await {
            Some(final_link) => {
                info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    provider = resolver.name(),
                    "link resolved"
                );
                Ok(final_link)
            }
            None => {
                error!(link = %link, "could not get a final link");
                Err(PlaybackError::Unresolvable(link))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::config::DebridEndpoints;
    use crate::filehost::{FileHostError, LinkPromoter};
    use crate::link_index::{IndexDump, MemoryLinkIndex};
    use crate::user_config::DebridService;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    struct NoPromotion;

    #[async_trait]
    impl LinkPromoter for NoPromotion {
        fn requires_promotion(&self, _link: &str) -> bool {
            false
        }

        async fn promote(
            &self,
            link: &str,
            _file_name: Option<&str>,
        ) -> Result<String, FileHostError> {
            Ok(link.to_string())
        }
    }

    fn resolver(cache: Arc<ResolutionCache>) -> PlaybackResolver {
        PlaybackResolver::new(
            cache,
            DebridContext {
                client: reqwest::Client::new(),
                endpoints: DebridEndpoints::default(),
                index: Arc::new(MemoryLinkIndex::new(IndexDump::default())),
                promoter: Arc::new(NoPromotion),
            },
        )
    }

    fn config(service: Option<DebridService>) -> UserConfig {
        UserConfig {
            addon_host: "http://localhost".to_string(),
            service,
            debrid_key: None,
            debrid_http: None,
            max_size: None,
            selected_quality_exclusion: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_resolution() {
        let cache = Arc::new(ResolutionCache::new());
        let cfg = config(Some(DebridService::RealDebrid));
        let key = ResolutionCache::key_for("L1");
        cache
            .put(
                &key,
                &CacheEntry {
                    config: cfg.clone(),
                    link: "L1".to_string(),
                    final_link: "https://cdn.example/L1".to_string(),
                    filesize: 1,
                },
            )
            .await;

        // Real-Debrid without a key would fail, so a hit proves the cache answered
        let url = resolver(cache)
            .resolve(&cfg, &encoding::encode("L1.mkv"), &key)
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/L1");
    }

    #[tokio::test]
    async fn test_miss_falls_back_to_resolution() {
        let cache = Arc::new(ResolutionCache::new());
        let playback = resolver(cache.clone());

        let url = playback
            .resolve(
                &config(None),
                &encoding::encode("unknown"),
                &encoding::encode("https://1fichier.com/?x"),
            )
            .await
            .unwrap();
        assert_eq!(url, "https://1fichier.com/?x");
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_error() {
        let playback = resolver(Arc::new(ResolutionCache::new()));
        let err = playback
            .resolve(
                &config(Some(DebridService::AllDebrid)),
                &encoding::encode("a.mkv"),
                &encoding::encode("https://1fichier.com/?x"),
            )
            .await;
        assert!(matches!(err, Err(PlaybackError::Unresolvable(link)) if link == "https://1fichier.com/?x"));
    }

    #[tokio::test]
    async fn test_missing_query() {
        let playback = resolver(Arc::new(ResolutionCache::new()));
        let err = playback.resolve(&config(None), "", "").await;
        assert!(matches!(err, Err(PlaybackError::MissingQuery)));
    }

    #[tokio::test]
    async fn test_bad_link_encoding() {
        let playback = resolver(Arc::new(ResolutionCache::new()));
        let err = playback.resolve(&config(None), "", "!!!").await;
        assert!(matches!(err, Err(PlaybackError::InvalidLink(_))));
    }
}
