use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::FichierConfig;

pub const FICHIER_HOST: &str = "1fichier";

#[derive(Error, Debug)]
pub enum FileHostError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// What the file host reports about a single link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

/// Per-link info lookup used to annotate candidates.
#[async_trait]
pub trait FileInfoService: Send + Sync {
    /// Whether `link` lives on the host this service can describe.
    fn supports(&self, link: &str) -> bool;

    async fn fetch_info(&self, link: &str) -> Result<FileInfo, FileHostError>;
}

/// Copies a restricted link into the host account to obtain a replacement
/// link that debrid providers accept.
#[async_trait]
pub trait LinkPromoter: Send + Sync {
    fn requires_promotion(&self, link: &str) -> bool;

    async fn promote(&self, link: &str, file_name: Option<&str>) -> Result<String, FileHostError>;
}

pub fn is_fichier_link(link: &str) -> bool {
    match url::Url::parse(link) {
        Ok(parsed) => parsed
            .host_str()
            .is_some_and(|host| host.contains(FICHIER_HOST)),
        Err(_) => link.contains(FICHIER_HOST),
    }
}

#[derive(Debug, Deserialize)]
struct CopyResponse {
    #[serde(default)]
    urls: Vec<CopiedUrl>,
}

#[derive(Debug, Deserialize)]
struct CopiedUrl {
    from_url: String,
    to_url: String,
}

pub struct FichierClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FichierClient {
    pub fn new(client: Client, config: &FichierConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.apikey.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn post(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, FileHostError> {
        let url = format!("{}/v1/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FileHostError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let value: serde_json::Value = response.json().await?;

        // 1fichier reports failures as {"status": "KO", "message": "..."} with HTTP 200
        if value.get("status").and_then(|s| s.as_str()) == Some("KO") {
            let message = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(FileHostError::ApiError(message.to_string()));
        }

        Ok(value)
    }
}

#[async_trait]
impl FileInfoService for FichierClient {
    fn supports(&self, link: &str) -> bool {
        self.has_api_key() && is_fichier_link(link)
    }

    async fn fetch_info(&self, link: &str) -> Result<FileInfo, FileHostError> {
        debug!(link, "fetching file info");
        let value = self.post("file/info.cgi", json!({ "url": link })).await?;
        serde_json::from_value(value).map_err(|e| FileHostError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LinkPromoter for FichierClient {
    fn requires_promotion(&self, link: &str) -> bool {
        self.has_api_key() && is_fichier_link(link)
    }

    async fn promote(&self, link: &str, file_name: Option<&str>) -> Result<String, FileHostError> {
        let mut body = json!({ "urls": [link], "folder_id": 0 });
        if let Some(name) = file_name {
            body["rename"] = json!(name);
        }

        debug!(link, "copying file into account");
        let value = self.post("file/cp.cgi", body).await?;
        let response: CopyResponse = serde_json::from_value(value)
            .map_err(|e| FileHostError::InvalidResponse(e.to_string()))?;

        response
            .urls
            .into_iter()
            .find(|u| u.from_url == link)
            .map(|u| u.to_url)
            .ok_or_else(|| FileHostError::InvalidResponse("no copied url in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fichier_link() {
        assert!(is_fichier_link("https://1fichier.com/?abc123"));
        assert!(is_fichier_link("https://www.1fichier.com/?abc123&af=1"));
        assert!(!is_fichier_link("https://mega.nz/file/abc"));
        // query strings mentioning the host do not count
        assert!(!is_fichier_link("https://example.com/?ref=1fichier"));
        // unparseable input falls back to a substring check
        assert!(is_fichier_link("1fichier.com/?abc"));
    }

    fn client(apikey: &str) -> FichierClient {
        FichierClient::new(
            Client::new(),
            &FichierConfig {
                apikey: apikey.to_string(),
                ..FichierConfig::default()
            },
        )
    }

    #[test]
    fn test_no_api_key_disables_lookups() {
        let link = "https://1fichier.com/?abc123";

        let keyless = client("");
        assert!(!keyless.supports(link));
        assert!(!keyless.requires_promotion(link));

        let keyed = client("k");
        assert!(keyed.supports(link));
        assert!(keyed.requires_promotion(link));
        assert!(!keyed.supports("https://mega.nz/file/abc"));
    }

    #[test]
    fn test_file_info_defaults_size() {
        let info: FileInfo = serde_json::from_str(r#"{"filename": "a.mkv"}"#).unwrap();
        assert_eq!(info.size, 0);
    }
}
