//! Expiring Cache
//!
//! Concurrent string-keyed map with a per-entry absolute expiry time and
//! an optional background janitor that evicts expired entries.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default time-to-live for cached entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
/// Default interval between janitor passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// DashMap-backed cache with lazy expiry on read.
///
/// `get` never returns an entry whose expiry has passed, whether or not
/// the janitor has run. Overwrites replace value and expiry together
/// under the shard lock, so concurrent readers see either the old entry
/// or the new one.
///
/// There is no capacity bound: entries accumulate until they expire and
/// are swept.
pub struct ExpiringCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache whose entries live for `ttl` after each `set`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live value for `key`.
    ///
    /// An expired entry found here is removed on the spot.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        // The read guard must be released before removing from the same shard.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    /// Store `value` under `key`, replacing any previous entry and its expiry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Remove the entry for `key`, returning its value if it was still live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .and_then(|(_, entry)| (entry.expires_at > now).then_some(entry.value))
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run one janitor pass, returning how many entries were evicted.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Start the background janitor.
    ///
    /// The task runs every `interval` until the returned handle is stopped
    /// or dropped. Must be called from within a Tokio runtime.
    pub fn start_sweep(&self, interval: Duration) -> SweepHandle {
        let entries = self.entries.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = purge(&entries);
                        if removed > 0 {
                            tracing::debug!("cache sweep removed {} expired entries", removed);
                        }
                    }
                    // Fires on an explicit stop and when the handle is dropped.
                    _ = &mut stop_rx => break,
                }
            }
            tracing::debug!("cache sweep stopped");
        });

        SweepHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }
}

impl<V> Default for ExpiringCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn purge<V>(entries: &DashMap<String, CacheEntry<V>>) -> usize {
    let now = Instant::now();
    let mut removed = 0;
    entries.retain(|_, entry| {
        let live = entry.expires_at > now;
        if !live {
            removed += 1;
        }
        live
    });
    removed
}

/// Handle to a running cache janitor.
///
/// Dropping the handle stops the janitor at its next scheduling point.
pub struct SweepHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Stop the janitor and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("cache sweep task ended abnormally: {}", e);
            }
        }
    }

    /// Whether the janitor task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}
