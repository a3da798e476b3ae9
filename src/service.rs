use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::ResolutionCache;
use crate::candidate::{self, Candidate};
use crate::debrid::{DebridContext, DebridResolver, HostMonitor};
use crate::enrich;
use crate::filehost::{FICHIER_HOST, FileInfoService};
use crate::link_index::{IndexError, LinkIndex};
use crate::media::{MediaKind, MetadataError, MetadataProvider};
use crate::orchestrator::{Orchestrator, ResolutionJob};
use crate::playback::{PlaybackError, PlaybackResolver};
use crate::quality;
use crate::user_config::{UserConfig, UserConfigError};

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] UserConfigError),
    #[error("metadata lookup failed: {0}")]
    Metadata(#[from] MetadataError),
    #[error("link index error: {0}")]
    Index(#[from] IndexError),
}

/// One stream in a listing response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEntry {
    pub name: String,
    pub title: String,
    pub link: String,
    pub file_name: Option<String>,
    pub size_bytes: u64,
    pub quality: String,
    pub url: String,
    /// Real-Debrid availability of the file host, set on Real-Debrid listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_up: Option<bool>,
}

impl StreamEntry {
    fn new(
        candidate: Candidate,
        config: &UserConfig,
        config_segment: &str,
        tag: &str,
        host_up: Option<bool>,
    ) -> Self {
        let url = config.playback_url(config_segment, candidate.display_name(), &candidate.link);
        let mut title = format!(
            "{}\n{}",
            candidate.display_name(),
            quality::size_human(candidate.size_bytes)
        );
        if host_up == Some(false) {
            title.push_str(&format!("\n{} down on Real-Debrid", FICHIER_HOST));
        }
        let name = if candidate.quality.is_empty() {
            format!("[{}]", tag)
        } else {
            format!("[{}] {}", tag, candidate.quality)
        };

        Self {
            name,
            title,
            link: candidate.link,
            file_name: candidate.file_name,
            size_bytes: candidate.size_bytes,
            quality: candidate.quality,
            url,
            host_up,
        }
    }
}

/// Listing and playback operations behind whatever serving layer sits in
/// front of them.
pub struct StreamService {
    metadata: Arc<dyn MetadataProvider>,
    file_info: Arc<dyn FileInfoService>,
    index: Arc<dyn LinkIndex>,
    orchestrator: Orchestrator,
    debrid: DebridContext,
    playback: PlaybackResolver,
    host_monitor: Arc<HostMonitor>,
}

impl StreamService {
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        file_info: Arc<dyn FileInfoService>,
        cache: Arc<ResolutionCache>,
        orchestrator: Orchestrator,
        debrid: DebridContext,
    ) -> Self {
        Self {
            metadata,
            file_info,
            index: debrid.index.clone(),
            orchestrator,
            playback: PlaybackResolver::new(cache, debrid.clone()),
            debrid,
            host_monitor: Arc::new(HostMonitor::new(FICHIER_HOST)),
        }
    }

    /// Share a host monitor that is refreshed elsewhere. Without one the
    /// file host is always reported up.
    pub fn with_host_monitor(mut self, monitor: Arc<HostMonitor>) -> Self {
        self.host_monitor = monitor;
        self
    }

    /// Build the listing for one title. Ranked streams come first, largest
    /// first, followed by the filtered-out ones in index order. Resolution
    /// of the ranked streams is scheduled in the background and never
    /// delays the response.
    pub async fn list_streams(
        &self,
        config_segment: &str,
        kind: MediaKind,
        item_id: &str,
    ) -> Result<Vec<StreamEntry>, ListingError> {
        let config = UserConfig::decode(config_segment)?;
        let media = self.metadata.get_metadata(item_id, kind).await?;
        let links = self.index.search(&media).await?;

        if links.is_empty() {
            info!(id = %media.id, %kind, "no links indexed");
            return Ok(Vec::new());
        }

        let candidates = enrich::annotate(self.file_info.as_ref(), links).await;
        let (ranked, rejected) = candidate::partition_ranked(&candidates, &config);
        let resolver = DebridResolver::for_config(&config, &self.debrid);
        let tag = resolver.tag();
        let host_up = matches!(resolver, DebridResolver::RewriteThenUnlock(_))
            .then(|| self.host_monitor.is_up());

        info!(
            id = %media.id,
            total = candidates.len(),
            ranked = ranked.len(),
            provider = resolver.name(),
            ?host_up,
            "built listing"
        );

        let entries = ranked
            .iter()
            .chain(rejected.iter())
            .cloned()
            .map(|c| StreamEntry::new(c, &config, config_segment, tag, host_up))
            .collect();

        if ranked.is_empty() {
            debug!("nothing to resolve in the background");
        } else {
            self.orchestrator.schedule(ResolutionJob {
                candidates: ranked,
                config,
                resolver,
            });
        }

        Ok(entries)
    }

    pub async fn playback(
        &self,
        config_segment: &str,
        encoded_file_name: &str,
        encoded_link: &str,
    ) -> Result<String, PlaybackError> {
        if encoded_link.is_empty() {
            return Err(PlaybackError::MissingQuery);
        }
        let config = UserConfig::decode(config_segment)?;
        self.playback
            .resolve(&config, encoded_file_name, encoded_link)
            .await
    }
}
