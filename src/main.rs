use std::sync::Arc;

use debrid_resolver::cache::ResolutionCache;
use debrid_resolver::config::{self, Config};
use debrid_resolver::debrid::{DebridContext, HostMonitor, RealDebridApi};
use debrid_resolver::doctor;
use debrid_resolver::filehost::{FICHIER_HOST, FichierClient};
use debrid_resolver::link_index::MemoryLinkIndex;
use debrid_resolver::media::MediaKind;
use debrid_resolver::orchestrator::Orchestrator;
use debrid_resolver::service::StreamService;
use debrid_resolver::tmdb::TmdbClient;
use debrid_resolver::user_config::redact_config;
use reqwest::Client;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  debrid-resolver doctor
  debrid-resolver streams <config> <movie|series> <id>
  debrid-resolver play <config> <file_name> <query>";

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("link index: {0}")]
    Index(#[from] debrid_resolver::link_index::IndexError),
    #[error("no TMDB API key configured")]
    NoTmdbKey,
    #[error(transparent)]
    Listing(#[from] debrid_resolver::service::ListingError),
    #[error(transparent)]
    Playback(#[from] debrid_resolver::playback::PlaybackError),
    #[error("failed to encode listing: {0}")]
    Output(#[from] serde_json::Error),
}

enum Command {
    Doctor,
    Streams {
        config: String,
        kind: MediaKind,
        id: String,
    },
    Play {
        config: String,
        file_name: String,
        query: String,
    },
}

fn parse_args(args: &[String]) -> Result<Command, CliError> {
    match args {
        [cmd] if cmd == "doctor" => Ok(Command::Doctor),
        [cmd, config, kind, id] if cmd == "streams" => {
            let kind = kind
                .parse::<MediaKind>()
                .map_err(|e| CliError::Usage(format!("{}\n{}", e, USAGE)))?;
            Ok(Command::Streams {
                config: config.clone(),
                kind,
                id: id.clone(),
            })
        }
        [cmd, config, file_name, query] if cmd == "play" => Ok(Command::Play {
            config: config.clone(),
            file_name: file_name.clone(),
            query: query.clone(),
        }),
        // an empty query is passed through so it reaches the MissingQuery check
        [cmd, config, file_name] if cmd == "play" => Ok(Command::Play {
            config: config.clone(),
            file_name: file_name.clone(),
            query: String::new(),
        }),
        _ => Err(CliError::Usage(USAGE.to_string())),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            if let config::ConfigError::NotFound(path) = &e {
                eprintln!("\nCreate a config file at: {}", path.display());
                eprintln!("\nExample config.toml:");
                eprintln!(
                    r#"
[index]
path = "/var/lib/debrid-resolver/links.json"

[tmdb]
apikey = "your-tmdb-key"

[fichier]
apikey = "your-1fichier-key"
"#
                );
            }
            std::process::exit(1);
        }
    };

    if let Err(e) = run(command, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: Config) -> Result<(), CliError> {
    let client = Client::builder()
        .timeout(config.resolver.request_timeout())
        .build()?;

    if let Command::Doctor = command {
        let results = doctor::run_checks(&config, &client).await;
        doctor::print_results(&results);
        if doctor::count(&results, doctor::CheckStatus::Error) > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let index = Arc::new(MemoryLinkIndex::load(&config.index.path)?);
    let fichier = Arc::new(FichierClient::new(client.clone(), &config.fichier));
    let tmdb = config.tmdb.as_ref();
    let metadata = TmdbClient::new(
        client.clone(),
        tmdb.map(|t| t.apikey.as_str()),
        tmdb.map(|t| t.language.as_str()).unwrap_or("es-ES"),
    )
    .ok_or(CliError::NoTmdbKey)?;

    let cache = Arc::new(ResolutionCache::new());
    let (orchestrator, handle) =
        Orchestrator::start(cache.clone(), config.resolver.queue_capacity);

    let monitor = Arc::new(HostMonitor::new(FICHIER_HOST));
    let status_task = match config.debrid.status_token.as_deref() {
        Some(token) if !token.is_empty() => {
            let api = RealDebridApi::new(client.clone(), &config.debrid.real_debrid_url, token);
            monitor.refresh(&api).await;
            Some(
                monitor
                    .clone()
                    .spawn_refresh(api, config.debrid.status_interval()),
            )
        }
        _ => None,
    };

    let service = StreamService::new(
        Arc::new(metadata),
        fichier.clone(),
        cache,
        orchestrator,
        DebridContext {
            client,
            endpoints: config.debrid.clone(),
            index: index.clone(),
            promoter: fichier,
        },
    )
    .with_host_monitor(monitor);

    let outcome: Result<(), CliError> = async {
        match command {
            Command::Streams { config: cfg, kind, id } => {
                let path = format!("/{}/stream/{}/{}", cfg, kind, id);
                info!(path = %redact_config(&path), "listing");
                let streams = service.list_streams(&cfg, kind, &id).await?;
                println!("{}", serde_json::to_string_pretty(&streams)?);
            }
            Command::Play {
                config: cfg,
                file_name,
                query,
            } => {
                let path = format!("/playback/{}/{}", cfg, file_name);
                info!(path = %redact_config(&path), "playback");
                let url = service.playback(&cfg, &file_name, &query).await?;
                println!("{}", url);
            }
            Command::Doctor => {}
        }
        Ok(())
    }
    .await;

    if let Some(task) = status_task {
        task.abort();
    }

    // Dropping the service closes the queue so the worker can drain and exit
    drop(service);
    handle.join().await;
    index.save(&config.index.path).await?;

    outcome
}
