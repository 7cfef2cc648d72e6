// Per-client fixed-window rate limiting with a background sweeper

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Window length and request ceiling for one protected endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }

    pub fn window(&self) -> ChronoDuration {
        ChronoDuration::milliseconds(i64::try_from(self.window_ms).unwrap_or(i64::MAX))
    }

    /// Window length in seconds, as shown to clients
    pub fn window_secs(&self) -> f64 {
        self.window_ms as f64 / 1000.0
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS, DEFAULT_MAX_REQUESTS)
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Counter for one client identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.reset_at < now
    }
}

/// In-memory limiter shared by all concurrent requests
///
/// Every admission is a single critical section over the store, so two
/// requests from the same client can never both observe a stale count.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Count a request from `client` and decide whether it may proceed
    pub fn admit(&self, client: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now();
        let mut entries = self.entries();

        match entries.get_mut(client) {
            Some(entry) if !entry.is_expired(now) => {
                entry.count = entry.count.saturating_add(1);
                let allowed = entry.count <= policy.max_requests;

                RateLimitDecision {
                    allowed,
                    limit: policy.max_requests,
                    remaining: if allowed {
                        policy.max_requests - entry.count
                    } else {
                        0
                    },
                    reset_at: entry.reset_at,
                }
            }
            _ => {
                let entry = RateLimitEntry {
                    count: 1,
                    reset_at: now + policy.window(),
                };
                entries.insert(client.to_string(), entry);

                RateLimitDecision {
                    allowed: true,
                    limit: policy.max_requests,
                    remaining: policy.max_requests.saturating_sub(1),
                    reset_at: entry.reset_at,
                }
            }
        }
    }

    /// Drop every entry whose window has already passed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Current entry for `client`, if one is tracked
    pub fn entry(&self, client: &str) -> Option<RateLimitEntry> {
        self.entries().get(client).copied()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the periodic sweep; stop it with [`SweeperHandle::stop`]
    pub fn start_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        let limiter = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = limiter.len(), "Swept expired rate-limit entries");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Rate-limit sweeper stopped");
        });

        tracing::info!(interval_ms = every.as_millis() as u64, "Rate-limit sweeper started");

        SweeperHandle {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        // A panic mid-update cannot leave an entry half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the background sweep task
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Rate-limit sweeper ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
