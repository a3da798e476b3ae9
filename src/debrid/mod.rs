pub mod all_debrid;
pub mod host_status;
pub mod real_debrid;

pub use all_debrid::AllDebridClient;
pub use host_status::HostMonitor;
pub use real_debrid::{RealDebrid, RealDebridApi};

use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::DebridEndpoints;
use crate::filehost::{FileHostError, LinkPromoter};
use crate::link_index::{IndexError, LinkIndex};
use crate::user_config::{DebridService, UserConfig};

#[derive(Error, Debug)]
pub enum DebridError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("link index error: {0}")]
    IndexError(#[from] IndexError),
    #[error("file host error: {0}")]
    FileHostError(#[from] FileHostError),
}

/// Shared collaborators every resolver is built from.
#[derive(Clone)]
pub struct DebridContext {
    pub client: Client,
    pub endpoints: DebridEndpoints,
    pub index: Arc<dyn LinkIndex>,
    pub promoter: Arc<dyn LinkPromoter>,
}

/// Turns a hoster link into a direct download URL.
///
/// Each provider family is one variant; adding a provider means adding a
/// variant here and a mapping in [`DebridResolver::for_config`].
pub enum DebridResolver {
    /// Restricted-host links are rewritten through the link index before
    /// being unlocked (Real-Debrid).
    RewriteThenUnlock(RealDebrid),
    /// The link is unlocked as is (AllDebrid).
    DirectUnlock(AllDebridClient),
    /// No usable provider; the original link is handed back.
    PassThrough,
}

impl DebridResolver {
    pub fn for_config(config: &UserConfig, ctx: &DebridContext) -> Self {
        let key = config.debrid_key.clone().unwrap_or_default();

        match config.service {
            Some(DebridService::RealDebrid) => {
                let api =
                    RealDebridApi::new(ctx.client.clone(), &ctx.endpoints.real_debrid_url, &key);
                Self::RewriteThenUnlock(RealDebrid::new(
                    api,
                    config.debrid_http.clone(),
                    ctx.index.clone(),
                    ctx.promoter.clone(),
                ))
            }
            Some(DebridService::AllDebrid) => Self::DirectUnlock(AllDebridClient::new(
                ctx.client.clone(),
                &ctx.endpoints.all_debrid_url,
                &key,
                &ctx.endpoints.agent,
            )),
            Some(DebridService::Unsupported(_)) | None => Self::PassThrough,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RewriteThenUnlock(_) => "RealDebrid",
            Self::DirectUnlock(_) => "AllDebrid",
            Self::PassThrough => "Direct",
        }
    }

    /// Short tag shown next to stream names.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RewriteThenUnlock(_) => "RD",
            Self::DirectUnlock(_) => "AD",
            Self::PassThrough => "DL",
        }
    }

    /// Resolve `link` to a playable URL. Errors are logged and reported as
    /// `None`; the caller decides whether that skips a candidate or fails a
    /// request.
    pub async fn resolve(&self, link: &str, file_name: Option<&str>) -> Option<String> {
        let result = match self {
            Self::RewriteThenUnlock(rd) => rd.resolve(link, file_name).await,
            Self::DirectUnlock(ad) => ad.unlock(link).await,
            Self::PassThrough => return Some(link.to_string()),
        };

        match result {
            Ok(url) => {
                debug!(link, provider = self.name(), "resolved link");
                Some(url)
            }
            Err(e) => {
                error!(link, provider = self.name(), error = %e, "failed to resolve link");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_index::{IndexDump, MemoryLinkIndex};
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

    fn ctx() -> DebridContext {
        DebridContext {
            client: Client::new(),
            endpoints: DebridEndpoints::default(),
            index: Arc::new(MemoryLinkIndex::new(IndexDump::default())),
            promoter: Arc::new(NoPromotion),
        }
    }

    fn config(service: Option<DebridService>, key: Option<&str>) -> UserConfig {
        UserConfig {
            addon_host: "http://localhost".to_string(),
            service,
            debrid_key: key.map(String::from),
            debrid_http: None,
            max_size: None,
            selected_quality_exclusion: BTreeSet::new(),
        }
    }

    #[test]
    fn test_for_config_selects_variant() {
        let ctx = ctx();
        let rd_config = config(Some(DebridService::RealDebrid), Some("k"));
        let rd = DebridResolver::for_config(&rd_config, &ctx);
        assert!(matches!(rd, DebridResolver::RewriteThenUnlock(_)));
        assert_eq!(rd.tag(), "RD");

        let ad_config = config(Some(DebridService::AllDebrid), Some("k"));
        let ad = DebridResolver::for_config(&ad_config, &ctx);
        assert!(matches!(ad, DebridResolver::DirectUnlock(_)));
        assert_eq!(ad.name(), "AllDebrid");

        let unknown_config = config(Some(DebridService::Unsupported("torbox".to_string())), None);
        let unknown = DebridResolver::for_config(&unknown_config, &ctx);
        assert!(matches!(unknown, DebridResolver::PassThrough));

        let none = DebridResolver::for_config(&config(None, None), &ctx);
        assert!(matches!(none, DebridResolver::PassThrough));
    }

    #[tokio::test]
    async fn test_pass_through_returns_original() {
        let resolver = DebridResolver::for_config(&config(None, None), &ctx());
        assert_eq!(
            resolver.resolve("https://1fichier.com/?abc", None).await,
            Some("https://1fichier.com/?abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let ctx = ctx();
        for service in [DebridService::RealDebrid, DebridService::AllDebrid] {
            let resolver = DebridResolver::for_config(&config(Some(service), None), &ctx);
            assert_eq!(resolver.resolve("https://1fichier.com/?abc", None).await, None);
        }
    }
}
