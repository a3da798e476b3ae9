use reqwest::Client;

use crate::config::Config;
use crate::debrid::RealDebridApi;
use crate::filehost::{FICHIER_HOST, FichierClient};
use crate::link_index::MemoryLinkIndex;
use crate::media::MediaKind;
use crate::tmdb::TmdbClient;

pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self::with_status(name, CheckStatus::Ok, message)
    }

    fn warning(name: &str, message: &str) -> Self {
        Self::with_status(name, CheckStatus::Warning, message)
    }

    fn error(name: &str, message: &str) -> Self {
        Self::with_status(name, CheckStatus::Error, message)
    }

    fn with_status(name: &str, status: CheckStatus, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Error => "✗",
        }
    }

    pub fn color(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "\x1b[32m",
            CheckStatus::Warning => "\x1b[33m",
            CheckStatus::Error => "\x1b[31m",
        }
    }
}

pub async fn run_checks(config: &Config, client: &Client) -> Vec<CheckResult> {
    vec![
        check_index(config),
        check_tmdb(config, client).await,
        check_fichier(config, client),
        check_real_debrid(config, client).await,
    ]
}

fn check_index(config: &Config) -> CheckResult {
    let path = &config.index.path;

    match MemoryLinkIndex::load(path) {
        Ok(index) if index.is_empty() => CheckResult::warning(
            "Link index",
            &format!("{} loaded but has no links", path.display()),
        ),
        Ok(index) => CheckResult::ok(
            "Link index",
            &format!("{} links in {}", index.len(), path.display()),
        ),
        Err(e) => CheckResult::error("Link index", &format!("{}: {}", path.display(), e)),
    }
}

async fn check_tmdb(config: &Config, client: &Client) -> CheckResult {
    let tmdb = config.tmdb.as_ref();
    let api_key = tmdb.map(|t| t.apikey.as_str());
    let language = tmdb.map(|t| t.language.as_str()).unwrap_or("es-ES");

    match TmdbClient::new(client.clone(), api_key, language) {
        Some(tmdb) => match tmdb.find_by_imdb("tt0133093", MediaKind::Movie).await {
            Ok(_) => CheckResult::ok("TMDB", "API key valid"),
            Err(e) => CheckResult::error("TMDB", &format!("API error: {}", e)),
        },
        None => CheckResult::error("TMDB", "No API key configured. Listings need TMDB ids."),
    }
}

fn check_fichier(config: &Config, client: &Client) -> CheckResult {
    if FichierClient::new(client.clone(), &config.fichier).has_api_key() {
        CheckResult::ok("1fichier", "API key configured")
    } else {
        CheckResult::warning(
            "1fichier",
            "No API key. File sizes and link promotion are disabled.",
        )
    }
}

async fn check_real_debrid(config: &Config, client: &Client) -> CheckResult {
    let Some(token) = config.debrid.status_token.as_deref() else {
        return CheckResult::warning("Real-Debrid", "No status_token set, host check skipped");
    };

    let api = RealDebridApi::new(client.clone(), &config.debrid.real_debrid_url, token);
    match api.host_is_up(FICHIER_HOST).await {
        Ok(true) => CheckResult::ok("Real-Debrid", "1fichier host is up"),
        Ok(false) => CheckResult::warning("Real-Debrid", "1fichier host is not reported up"),
        Err(e) => CheckResult::error("Real-Debrid", &format!("Status check failed: {}", e)),
    }
}

pub fn print_results(results: &[CheckResult]) {
    let reset = "\x1b[0m";

    println!("\ndebrid-resolver doctor\n");

    for result in results {
        println!(
            "  {}{} {}{}  {}",
            result.color(),
            result.icon(),
            result.name,
            reset,
            result.message
        );
    }

    println!();

    let errors = count(results, CheckStatus::Error);
    let warnings = count(results, CheckStatus::Warning);

    if errors > 0 {
        println!("  {} error(s), {} warning(s)\n", errors, warnings);
    } else if warnings > 0 {
        println!("  {} warning(s), running with limited features.\n", warnings);
    } else {
        println!("  All checks passed!\n");
    }
}

pub fn count(results: &[CheckResult], status: CheckStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}
