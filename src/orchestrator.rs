use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, ResolutionCache};
use crate::candidate::Candidate;
use crate::debrid::DebridResolver;
use crate::user_config::UserConfig;

/// Ranked candidates to resolve in the background, with the config and
/// resolver of the listing request that produced them.
pub struct ResolutionJob {
    pub candidates: Vec<Candidate>,
    pub config: UserConfig,
    pub resolver: DebridResolver,
}

/// Resolve each candidate in order and cache the successes. Candidates are
/// handled one at a time, largest first, yielding between them.
pub async fn resolve_and_cache(job: ResolutionJob, cache: &ResolutionCache) -> usize {
    let ResolutionJob {
        candidates,
        config,
        resolver,
    } = job;

    let total = candidates.len();
    let mut cached = 0;

    for candidate in candidates {
        let resolved = resolver
            .resolve(&candidate.link, candidate.file_name.as_deref())
            .await;

        match resolved {
            Some(final_link) => {
                let entry = CacheEntry {
                    config: config.clone(),
                    link: candidate.link.clone(),
                    final_link,
                    filesize: candidate.size_bytes,
                };
                cache
                    .put(&ResolutionCache::key_for(&candidate.link), &entry)
                    .await;
                cached += 1;
            }
            None => debug!(link = %candidate.link, "skipping unresolved candidate"),
        }

        tokio::task::yield_now().await;
    }

    info!(total, cached, provider = resolver.name(), "background resolution finished");
    cached
}

/// Schedules background resolution runs without waiting for them.
///
/// Jobs go through a bounded queue to a worker loop that starts each run as
/// its own task, so one stalled provider call holds up only its own run.
#[derive(Clone)]
pub struct Orchestrator {
    tx: mpsc::Sender<ResolutionJob>,
}

/// Completes once every [`Orchestrator`] clone is dropped and all in-flight
/// runs have finished.
pub struct OrchestratorHandle {
    worker: JoinHandle<()>,
}

impl Orchestrator {
    pub fn start(cache: Arc<ResolutionCache>, capacity: usize) -> (Self, OrchestratorHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(rx, cache));
        (Self { tx }, OrchestratorHandle { worker })
    }

    /// Queue a job. Returns false if it was dropped because the queue is
    /// full or the worker is gone.
    pub fn schedule(&self, job: ResolutionJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!(
                    candidates = job.candidates.len(),
                    "resolution queue full, dropping job"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!("resolution worker is not running, dropping job");
                false
            }
        }
    }
}

impl OrchestratorHandle {
    pub async fn join(self) {
        if let Err(e) = self.worker.await {
            error!(error = %e, "resolution worker failed");
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<ResolutionJob>, cache: Arc<ResolutionCache>) {
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            job = rx.recv() => match job {
                Some(job) => {
                    let cache = cache.clone();
                    runs.spawn(async move { resolve_and_cache(job, &cache).await });
                }
                None => break,
            },
            Some(finished) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = finished {
                    error!(error = %e, "resolution run failed");
                }
            }
        }
    }

    while let Some(finished) = runs.join_next().await {
        if let Err(e) = finished {
            error!(error = %e, "resolution run failed");
        }
    }

    debug!("resolution worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebridEndpoints;
    use crate::debrid::AllDebridClient;
    use crate::filehost::FileInfo;
    use std::collections::BTreeSet;

    fn config() -> UserConfig {
        UserConfig {
            addon_host: "http://localhost".to_string(),
            service: None,
            debrid_key: None,
            debrid_http: None,
            max_size: None,
            selected_quality_exclusion: BTreeSet::new(),
        }
    }

    fn candidates(links: &[&str]) -> Vec<Candidate> {
        links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let mut c = Candidate::new(*link);
                c.enrich(FileInfo {
                    filename: format!("{}.mkv", link),
                    size: 100 - i as u64,
                });
                c
            })
            .collect()
    }

    fn job(links: &[&str], resolver: DebridResolver) -> ResolutionJob {
        ResolutionJob {
            candidates: candidates(links),
            config: config(),
            resolver,
        }
    }

    fn failing_resolver() -> DebridResolver {
        let endpoints = DebridEndpoints::default();
        DebridResolver::DirectUnlock(AllDebridClient::new(
            reqwest::Client::new(),
            &endpoints.all_debrid_url,
            "",
            &endpoints.agent,
        ))
    }

    #[tokio::test]
    async fn test_resolve_and_cache_writes_entries() {
        let cache = ResolutionCache::new();
        let passthrough = job(&["L1", "L2"], DebridResolver::PassThrough);
        let cached = resolve_and_cache(passthrough, &cache).await;

        assert_eq!(cached, 2);
        let entry = cache
            .get(&ResolutionCache::key_for("L1"), &config())
            .await
            .unwrap();
        assert_eq!(entry.final_link, "L1");
        assert_eq!(entry.filesize, 100);
    }

    #[tokio::test]
    async fn test_resolve_and_cache_skips_failures() {
        let cache = ResolutionCache::new();
        let cached = resolve_and_cache(job(&["L1", "L2"], failing_resolver()), &cache).await;

        assert_eq!(cached, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_idempotent() {
        let cache = ResolutionCache::new();
        resolve_and_cache(job(&["L1"], DebridResolver::PassThrough), &cache).await;
        let first = cache.get(&ResolutionCache::key_for("L1"), &config()).await;
        resolve_and_cache(job(&["L1"], DebridResolver::PassThrough), &cache).await;
        let second = cache.get(&ResolutionCache::key_for("L1"), &config()).await;

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_scheduled_jobs_complete_before_join() {
        let cache = Arc::new(ResolutionCache::new());
        let (orchestrator, handle) = Orchestrator::start(cache.clone(), 4);

        assert!(orchestrator.schedule(job(&["L1", "L2"], DebridResolver::PassThrough)));
        assert!(orchestrator.schedule(job(&["L3"], DebridResolver::PassThrough)));
        drop(orchestrator);
        handle.join().await;

        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn test_schedule_drops_when_full() {
        let cache = Arc::new(ResolutionCache::new());
        let (orchestrator, handle) = Orchestrator::start(cache.clone(), 1);

        // single-threaded test runtime: the worker has not run yet
        assert!(orchestrator.schedule(job(&["L1"], DebridResolver::PassThrough)));
        assert!(!orchestrator.schedule(job(&["L2"], DebridResolver::PassThrough)));
        drop(orchestrator);
        handle.join().await;

        assert_eq!(cache.len().await, 1);
        assert!(
            cache
                .get(&ResolutionCache::key_for("L2"), &config())
                .await
                .is_none()
        );
    }
}
