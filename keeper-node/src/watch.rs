//! Registry of armed one-shot watches.
//!
//! Every watch the client arms is recorded here before the service is asked
//! to arm it, so the key set is always a superset of server-side watches.
//! Notifications from the session dispatcher are matched against the
//! registry; a notification for a path that is no longer registered is
//! discarded.

use dashmap::DashMap;
use keeper_common::{EventKind, WatchKind};
use metrics::{counter, gauge};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

/// How a wait on a watch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The service delivered an event for the watched path
    Fired(EventKind),
    /// The watch was released locally before it fired
    Released,
    /// The session owning the watch expired
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WatchKey {
    path: String,
    kind: WatchKind,
}

/// One armed watch and the local waiters subscribed to it
#[derive(Debug)]
pub struct WatchEntry {
    pub path: String,
    pub kind: WatchKind,
    pub armed_at: Instant,
    subscribers: Vec<(u64, oneshot::Sender<WatchOutcome>)>,
}

impl WatchEntry {
    /// Ids of the handles waiting on this watch
    pub fn handle_ids(&self) -> Vec<u64> {
        self.subscribers.iter().map(|(id, _)| *id).collect()
    }
}

/// Single-fire wait condition for one registered watch
#[derive(Debug)]
pub struct WatchHandle {
    id: u64,
    path: String,
    kind: WatchKind,
    receiver: oneshot::Receiver<WatchOutcome>,
}

impl WatchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> WatchKind {
        self.kind
    }

    /// Wait for the watch to fire, be released, or die with the session
    pub async fn wait(self) -> WatchOutcome {
        self.receiver.await.unwrap_or(WatchOutcome::Released)
    }
}

/// Counters describing registry activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub armed: usize,
    pub registered: u64,
    pub fired: u64,
    pub discarded: u64,
    pub released: u64,
}

/// Concurrent registry of armed watches, keyed by logical path and kind
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: DashMap<WatchKey, WatchEntry>,
    next_id: AtomicU64,
    registered: AtomicU64,
    fired: AtomicU64,
    discarded: AtomicU64,
    released: AtomicU64,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a watch on `path` and return the handle its waiter blocks on
    pub fn register(&self, path: &str, kind: WatchKind) -> WatchHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = oneshot::channel();

        let key = WatchKey {
            path: path.to_string(),
            kind,
        };
        self.entries
            .entry(key)
            .or_insert_with(|| WatchEntry {
                path: path.to_string(),
                kind,
                armed_at: Instant::now(),
                subscribers: Vec::new(),
            })
            .subscribers
            .push((id, sender));

        self.registered.fetch_add(1, Ordering::Relaxed);
        gauge!("keeper_watches_armed", self.entries.len() as f64);
        debug!(path = %path, kind = ?kind, handle = id, "Watch registered");

        WatchHandle {
            id,
            path: path.to_string(),
            kind,
            receiver,
        }
    }

    /// Drop one handle's subscription, removing the entry once unused
    pub fn cancel(&self, handle: &WatchHandle) {
        let key = WatchKey {
            path: handle.path.clone(),
            kind: handle.kind,
        };
        let now_empty = match self.entries.get_mut(&key) {
            Some(mut entry) => {
                entry.subscribers.retain(|(id, _)| *id != handle.id);
                entry.subscribers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.entries.remove_if(&key, |_, entry| entry.subscribers.is_empty());
        }
        gauge!("keeper_watches_armed", self.entries.len() as f64);
    }

    /// Paths with at least one armed watch, sorted
    pub fn list(&self) -> Vec<String> {
        let paths: BTreeSet<String> = self
            .entries
            .iter()
            .map(|entry| entry.key().path.clone())
            .collect();
        paths.into_iter().collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| entry.key().path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every watch on `path`; unknown paths are a no-op
    pub fn release(&self, path: &str) {
        let mut removed = 0u64;
        for kind in [WatchKind::Data, WatchKind::Exists, WatchKind::Children] {
            let key = WatchKey {
                path: path.to_string(),
                kind,
            };
            if let Some((_, entry)) = self.entries.remove(&key) {
                removed += entry.subscribers.len() as u64;
            }
        }

        if removed > 0 {
            self.released.fetch_add(removed, Ordering::Relaxed);
            debug!(path = %path, waiters = removed, "Watch released");
        }
        gauge!("keeper_watches_armed", self.entries.len() as f64);
    }

    /// Release every registered watch
    pub fn release_all(&self) {
        for path in self.list() {
            self.release(&path);
        }
        // entries registered concurrently with the sweep above
        self.entries.retain(|_, entry| {
            self.released
                .fetch_add(entry.subscribers.len() as u64, Ordering::Relaxed);
            false
        });
        gauge!("keeper_watches_armed", 0.0);
    }

    /// Deliver a notification; returns the number of waiters woken
    pub fn fire(&self, path: &str, event: EventKind) -> usize {
        let mut woken = 0;
        for kind in [WatchKind::Data, WatchKind::Exists, WatchKind::Children] {
            if !event.satisfies(kind) {
                continue;
            }
            let key = WatchKey {
                path: path.to_string(),
                kind,
            };
            if let Some((_, entry)) = self.entries.remove(&key) {
                for (_, sender) in entry.subscribers {
                    if sender.send(WatchOutcome::Fired(event)).is_ok() {
                        woken += 1;
                    }
                }
            }
        }

        if woken == 0 {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            counter!("keeper_watch_discarded", 1);
            debug!(path = %path, event = ?event, "Discarding notification for unregistered watch");
        } else {
            self.fired.fetch_add(woken as u64, Ordering::Relaxed);
            counter!("keeper_watch_fired", woken as u64);
            debug!(path = %path, event = ?event, waiters = woken, "Watch fired");
        }
        gauge!("keeper_watches_armed", self.entries.len() as f64);

        woken
    }

    /// Wake every waiter with `SessionExpired` and clear the registry
    pub fn expire_all(&self) {
        let keys: Vec<WatchKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                for (_, sender) in entry.subscribers {
                    let _ = sender.send(WatchOutcome::SessionExpired);
                }
            }
        }
        gauge!("keeper_watches_armed", self.entries.len() as f64);
    }

    pub fn stats(&self) -> WatchStats {
        WatchStats {
            armed: self.entries.len(),
            registered: self.registered.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }
}
