use reqwest::Client;
use serde::Deserialize;

use super::DebridError;

#[derive(Debug, Deserialize)]
struct UnlockResponse {
    status: String,
    data: Option<UnlockData>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UnlockData {
    link: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct AllDebridClient {
    client: Client,
    base_url: String,
    api_key: String,
    agent: String,
}

impl AllDebridClient {
    pub fn new(client: Client, base_url: &str, api_key: &str, agent: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent: agent.to_string(),
        }
    }

    /// Unlock `link` and return the direct download URL from `data.link`.
    pub async fn unlock(&self, link: &str) -> Result<String, DebridError> {
        if self.api_key.is_empty() {
            return Err(DebridError::MissingApiKey("AllDebrid"));
        }

        let url = format!("{}/link/unlock", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("agent", self.agent.as_str()),
                ("apikey", self.api_key.as_str()),
                ("link", link),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DebridError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let unlock: UnlockResponse = response.json().await?;

        if unlock.status != "success" {
            let message = unlock
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| format!("status {}", unlock.status));
            return Err(DebridError::ApiError(message));
        }

        unlock
            .data
            .map(|d| d.link)
            .filter(|link| !link.is_empty())
            .ok_or_else(|| DebridError::InvalidResponse("missing data.link".to_string()))
    }
}
