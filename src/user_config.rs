use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::encoding::{self, EncodingError};

#[derive(Error, Debug)]
pub enum UserConfigError {
    #[error("invalid config encoding: {0}")]
    EncodingError(#[from] EncodingError),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

/// Debrid backend selected by the user. Names without a resolver keep their
/// raw value so configs naming different backends never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DebridService {
    RealDebrid,
    AllDebrid,
    Unsupported(String),
}

impl From<String> for DebridService {
    fn from(name: String) -> Self {
        match name.as_str() {
            "realdebrid" => Self::RealDebrid,
            "alldebrid" => Self::AllDebrid,
            _ => Self::Unsupported(name),
        }
    }
}

impl From<DebridService> for String {
    fn from(service: DebridService) -> Self {
        match service {
            DebridService::RealDebrid => "realdebrid".to_string(),
            DebridService::AllDebrid => "alldebrid".to_string(),
            DebridService::Unsupported(name) => name,
        }
    }
}

/// Per-request preferences decoded from the configuration URL segment.
///
/// Two configs are equal when every recognized field matches. Unknown keys
/// in the incoming JSON are dropped on decode, so they never take part in
/// the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub addon_host: String,
    #[serde(default)]
    pub service: Option<DebridService>,
    #[serde(default)]
    pub debrid_key: Option<String>,
    /// Real-Debrid HTTP folder that mirrors the account's downloads
    #[serde(default)]
    pub debrid_http: Option<String>,
    /// Size ceiling in GB
    #[serde(default, deserialize_with = "number_or_string")]
    pub max_size: Option<u32>,
    #[serde(default)]
    pub selected_quality_exclusion: BTreeSet<String>,
}

impl UserConfig {
    pub fn decode(segment: &str) -> Result<Self, UserConfigError> {
        let json = encoding::decode(segment)?;
        let config: UserConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Canonical encoding: fields are always written in declaration order and
    /// the exclusion set is sorted.
    pub fn encode(&self) -> Result<String, UserConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(encoding::encode(&json))
    }

    fn validate(&self) -> Result<(), UserConfigError> {
        let host = self.addon_host.trim_end_matches('/');
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(UserConfigError::ValidationError(
                "addonHost must start with http:// or https://".to_string(),
            ));
        }
        Ok(())
    }

    pub fn excludes_quality(&self, quality: &str) -> bool {
        self.selected_quality_exclusion.contains(quality)
    }

    /// URL the client follows to start playback of `link`.
    pub fn playback_url(&self, config_segment: &str, file_name: &str, link: &str) -> String {
        format!(
            "{}/playback/{}/{}/{}",
            self.addon_host.trim_end_matches('/'),
            config_segment,
            encoding::encode(file_name),
            encoding::encode(link)
        )
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid maxSize: {}", s))),
    }
}

/// Replace encoded configuration segments in a request path before logging.
/// Configs are base64 JSON objects, so they start with `ey`.
pub fn redact_config(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("ey") && segment.len() > 16 {
                "<SENSITIVE_DATA>"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
