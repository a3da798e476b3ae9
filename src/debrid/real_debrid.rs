use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::DebridError;
use crate::filehost::LinkPromoter;
use crate::link_index::LinkIndex;

static HREF_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*"([^"]+)""#).ok());

/// Response of `POST /unrestrict/link`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnrestrictedLink {
    pub download: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
}

/// Thin client over the Real-Debrid REST API.
#[derive(Clone)]
pub struct RealDebridApi {
    client: Client,
    base_url: String,
    token: String,
}

impl RealDebridApi {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn ensure_token(&self) -> Result<(), DebridError> {
        if self.token.is_empty() {
            return Err(DebridError::MissingApiKey("Real-Debrid"));
        }
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DebridError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DebridError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }

    pub async fn unrestrict(&self, link: &str) -> Result<UnrestrictedLink, DebridError> {
        self.ensure_token()?;
        let url = format!("{}/unrestrict/link", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[("link", link)])
            .send()
            .await?;

        let unrestricted: UnrestrictedLink = Self::check(response).await?.json().await?;
        Ok(unrestricted)
    }

    pub async fn hosts_status(&self) -> Result<HashMap<String, HostStatus>, DebridError> {
        self.ensure_token()?;
        let url = format!("{}/hosts/status", self.base_url);

        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let hosts: HashMap<String, HostStatus> = Self::check(response).await?.json().await?;
        Ok(hosts)
    }

    /// Whether any host whose domain contains `needle` reports `up`.
    pub async fn host_is_up(&self, needle: &str) -> Result<bool, DebridError> {
        let hosts = self.hosts_status().await?;
        let needle = needle.to_lowercase();

        Ok(hosts
            .iter()
            .filter(|(domain, _)| domain.to_lowercase().contains(&needle))
            .any(|(_, info)| info.status.eq_ignore_ascii_case("up")))
    }

    /// Search the account's HTTP download folder for `filename`.
    pub async fn find_link_in_folder(
        &self,
        folder: &str,
        filename: &str,
    ) -> Result<Option<String>, DebridError> {
        let folder = format!("{}/", folder.trim_end_matches('/'));
        let base = url::Url::parse(&folder)
            .map_err(|e| DebridError::InvalidResponse(format!("bad folder url: {}", e)))?;

        let response = self.client.get(base.as_str()).send().await?;
        let listing = Self::check(response).await?.text().await?;

        let Some(re) = HREF_RE.as_ref() else {
            return Ok(None);
        };

        let found = re
            .captures_iter(&listing)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .find(|href| {
                let last = href
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or_default();
                urlencoding::decode(last).is_ok_and(|decoded| decoded == filename)
            })
            .and_then(|href| base.join(href).ok())
            .map(|url| url.to_string());

        Ok(found)
    }
}

/// Real-Debrid resolution: restricted links are promoted once through the
/// file host, the replacement is remembered in the link index, and the
/// unlocked file is served from the account's HTTP folder when one is set.
pub struct RealDebrid {
    api: RealDebridApi,
    http_folder: Option<String>,
    index: Arc<dyn LinkIndex>,
    promoter: Arc<dyn LinkPromoter>,
}

impl RealDebrid {
    pub fn new(
        api: RealDebridApi,
        http_folder: Option<String>,
        index: Arc<dyn LinkIndex>,
        promoter: Arc<dyn LinkPromoter>,
    ) -> Self {
        Self {
            api,
            http_folder: http_folder.filter(|f| !f.trim().is_empty()),
            index,
            promoter,
        }
    }

    pub fn api(&self) -> &RealDebridApi {
        &self.api
    }

    /// Link that should be sent to the unlock endpoint in place of `link`.
    pub async fn rewrite_link(
        &self,
        link: &str,
        file_name: Option<&str>,
    ) -> Result<String, DebridError> {
        if !self.promoter.requires_promotion(link) {
            return Ok(link.to_string());
        }

        if let Some(rewritten) = self.index.get_rewrite(link).await? {
            debug!(link, rewritten = %rewritten, "using stored rewrite");
            return Ok(rewritten);
        }

        // only catalogue links are copied; the replacement must be storable
        if !self.index.contains(link).await? {
            debug!(link, "link not indexed, unlocking as is");
            return Ok(link.to_string());
        }

        match self.promoter.promote(link, file_name).await {
            Ok(replacement) => {
                self.index.set_rewrite(link, &replacement).await?;
                info!(link, replacement = %replacement, "stored rewrite");
                Ok(replacement)
            }
            Err(e) => {
                warn!(link, error = %e, "promotion failed, unlocking original link");
                Ok(link.to_string())
            }
        }
    }

    pub async fn resolve(
        &self,
        link: &str,
        file_name: Option<&str>,
    ) -> Result<String, DebridError> {
        self.api.ensure_token()?;

        let target = self.rewrite_link(link, file_name).await?;
        let unrestricted = self.api.unrestrict(&target).await?;

        if let Some(folder) = self.http_folder.as_deref() {
            match unrestricted.filename.as_deref() {
                Some(filename) => match self.api.find_link_in_folder(folder, filename).await {
                    Ok(Some(folder_link)) => return Ok(folder_link),
                    Ok(None) => debug!(filename, "file not present in HTTP folder"),
                    Err(e) => warn!(filename, error = %e, "HTTP folder lookup failed"),
                },
                None => warn!(link, "unlock response has no filename, using download link"),
            }
        }

        Ok(unrestricted.download)
    }
}
