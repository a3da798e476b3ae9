use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::RealDebridApi;

/// Last known Real-Debrid availability of one hoster. Starts out up and is
/// only ever replaced by a fresh status check.
#[derive(Debug)]
pub struct HostMonitor {
    host: &'static str,
    up: AtomicBool,
}

impl HostMonitor {
    pub fn new(host: &'static str) -> Self {
        Self {
            host,
            up: AtomicBool::new(true),
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::Relaxed);
    }

    /// Ask Real-Debrid for the host's status. A failed check counts as up.
    pub async fn refresh(&self, api: &RealDebridApi) -> bool {
        let up = match api.host_is_up(self.host).await {
            Ok(up) => up,
            Err(e) => {
                warn!(host = self.host, error = %e, "host status check failed");
                true
            }
        };

        self.set_up(up);
        info!(host = self.host, up, "host status updated");
        up
    }

    /// Refresh every `period`, starting one period from now, until the
    /// returned task is aborted.
    pub fn spawn_refresh(self: Arc<Self>, api: RealDebridApi, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.refresh(&api).await;
            }
        })
    }
}
