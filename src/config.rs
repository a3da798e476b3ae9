use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

/// Service-level settings. Per-request user preferences live in
/// [`crate::user_config::UserConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tmdb: Option<TmdbConfig>,
    #[serde(default)]
    pub fichier: FichierConfig,
    #[serde(default)]
    pub debrid: DebridEndpoints,
    pub index: IndexConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub apikey: String,
    #[serde(default = "default_tmdb_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FichierConfig {
    #[serde(default = "default_fichier_url")]
    pub url: String,
    #[serde(default)]
    pub apikey: String,
}

impl Default for FichierConfig {
    fn default() -> Self {
        Self {
            url: default_fichier_url(),
            apikey: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebridEndpoints {
    #[serde(default = "default_real_debrid_url")]
    pub real_debrid_url: String,
    #[serde(default = "default_all_debrid_url")]
    pub all_debrid_url: String,
    #[serde(default = "default_agent")]
    pub agent: String,
    /// Real-Debrid token used only for the host status check
    pub status_token: Option<String>,
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

impl Default for DebridEndpoints {
    fn default() -> Self {
        Self {
            real_debrid_url: default_real_debrid_url(),
            all_debrid_url: default_all_debrid_url(),
            agent: default_agent(),
            status_token: None,
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DebridEndpoints {
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_tmdb_language() -> String {
    "es-ES".to_string()
}

fn default_fichier_url() -> String {
    "https://api.1fichier.com".to_string()
}

fn default_real_debrid_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}

fn default_all_debrid_url() -> String {
    "https://api.alldebrid.com/v4".to_string()
}

fn default_agent() -> String {
    "debrid-resolver".to_string()
}

fn default_status_interval_secs() -> u64 {
    15 * 60
}

fn default_queue_capacity() -> usize {
    64
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.clone()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "debrid-resolver")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("fichier.url", &self.fichier.url),
            ("debrid.real_debrid_url", &self.debrid.real_debrid_url),
            ("debrid.all_debrid_url", &self.debrid.all_debrid_url),
        ];

        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if self.resolver.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "resolver.queue_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let config = Config::parse(
            r#"
[index]
path = "/var/lib/debrid-resolver/index.json"
"#,
        )
        .unwrap();

        assert!(config.tmdb.is_none());
        assert_eq!(config.fichier.url, "https://api.1fichier.com");
        assert_eq!(config.debrid.real_debrid_url, "https://api.real-debrid.com/rest/1.0");
        assert_eq!(config.resolver.queue_capacity, 64);
        assert_eq!(config.resolver.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.debrid.status_interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
[tmdb]
apikey = "tmdb-key"

[fichier]
apikey = "fichier-key"

[debrid]
agent = "my-agent"
status_token = "rd-token"
status_interval_secs = 60

[index]
path = "index.json"

[resolver]
queue_capacity = 8
request_timeout_secs = 10
"#,
        )
        .unwrap();

        let tmdb = config.tmdb.unwrap();
        assert_eq!(tmdb.apikey, "tmdb-key");
        assert_eq!(tmdb.language, "es-ES");
        assert_eq!(config.fichier.apikey, "fichier-key");
        assert_eq!(config.debrid.agent, "my-agent");
        assert_eq!(config.debrid.status_token.as_deref(), Some("rd-token"));
        assert_eq!(config.debrid.status_interval(), Duration::from_secs(60));
        assert_eq!(config.resolver.queue_capacity, 8);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let err = Config::parse(
            r#"
[fichier]
url = "api.1fichier.com"

[index]
path = "index.json"
"#,
        );
        assert!(matches!(err, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let err = Config::parse(
            r#"
[index]
path = "index.json"

[resolver]
queue_capacity = 0
"#,
        );
        assert!(matches!(err, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let path = PathBuf::from("/nonexistent/debrid-resolver/config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::NotFound(_))));
    }
}
