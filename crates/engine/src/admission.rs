// engine/src/admission.rs

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, trace};

/// Time-bounded set of recently submitted transaction ids.
///
/// Entries older than the TTL count as absent even before the sweeper
/// removes them.
#[derive(Debug)]
pub struct TxIdCache {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl TxIdCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_live(&self, marked_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(marked_at) < self.ttl
    }

    pub fn contains(&self, txid: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(txid)
            .is_some_and(|marked_at| self.is_live(*marked_at, now))
    }

    /// Mark `txid` unless a live entry exists. Returns true if this call
    /// made the mark.
    pub fn check_and_mark(&self, txid: &str) -> bool {
        let now = Instant::now();
        match self.entries.entry(txid.to_string()) {
            Entry::Occupied(mut entry) => {
                if self.is_live(*entry.get(), now) {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    pub fn remove(&self, txid: &str) {
        self.entries.remove(txid);
    }

    /// Drop expired entries, returning how many went
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, marked_at| self.is_live(*marked_at, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purge expired entries every `interval` until `stop` turns true or the
    /// cache is dropped. Does nothing outside a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, mut stop: watch::Receiver<bool>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime, tx id cache relies on lazy expiry");
            return;
        };
        let cache: Weak<Self> = Arc::downgrade(self);

        handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            trace!(purged, remaining = cache.len(), "Tx id cache swept");
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }
}
