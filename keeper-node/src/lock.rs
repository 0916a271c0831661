//! Distributed mutual-exclusion lock over sequential ephemeral nodes.
//!
//! Each acquirer creates an ephemeral sequential child of the lock root. The
//! lowest sequence number holds the lock; every other contender watches only
//! its immediate predecessor, so a release wakes exactly one waiter. After a
//! wake-up the children are read again: a vanished predecessor may have been
//! a waiter that crashed, not the holder.
//!
//! A contender node that cannot be deleted after a failed acquisition is
//! kept as stale and removed before this handle queues again; otherwise it
//! would sit ahead of every later contender for the life of the session.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use keeper_common::{path, sequence, CreateMode};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{KeeperError, Result};
use crate::gateway::SessionGateway;
use crate::watch::WatchOutcome;

/// Name prefix of contender nodes under the lock root
pub const NODE_PREFIX: &str = "seq-";

/// A held lock, returned by [`DistributedLock::acquire`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockNode {
    path: String,
    session_id: i64,
    acquired_at: DateTime<Utc>,
}

impl LockNode {
    /// Logical path of the contender node
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Node name, e.g. `seq-0000000004`
    pub fn name(&self) -> &str {
        path::file_name(&self.path)
    }

    pub fn sequence(&self) -> Option<u64> {
        sequence::parse(self.name())
    }

    /// Session that owns the node; the lock is lost if it expires
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

#[derive(Debug, Default)]
struct LockCounters {
    acquired: AtomicU64,
    released: AtomicU64,
    waits: AtomicU64,
    lost: AtomicU64,
}

/// Lock statistics
#[derive(Debug, Clone, Default)]
pub struct LockStats {
    pub held: usize,
    pub acquired: u64,
    pub released: u64,
    pub waits: u64,
    pub lost: u64,
    /// Contender nodes from failed acquisitions still awaiting deletion
    pub stale: usize,
}

/// Client handle for one lock root
pub struct DistributedLock {
    gateway: Arc<SessionGateway>,
    root: String,
    held: DashSet<String>,
    /// Failed contender path -> session that owns it
    stale: DashMap<String, i64>,
    counters: LockCounters,
}

impl DistributedLock {
    pub fn new(gateway: Arc<SessionGateway>, root: &str) -> Self {
        Self {
            gateway,
            root: path::normalize(root),
            held: DashSet::new(),
            stale: DashMap::new(),
            counters: LockCounters::default(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether this handle currently holds `node`
    pub fn is_held(&self, node: &LockNode) -> bool {
        self.held.contains(&node.path)
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            held: self.held.len(),
            acquired: self.counters.acquired.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            waits: self.counters.waits.load(Ordering::Relaxed),
            lost: self.counters.lost.load(Ordering::Relaxed),
            stale: self.stale.len(),
        }
    }

    /// Block until the lock is held
    ///
    /// Fails with `SessionExpired` if the session dies while waiting; the
    /// contender node is gone with it. Stale contenders left in the live
    /// session are deleted first, and the acquisition fails if one of them
    /// cannot be.
    pub async fn acquire(&self) -> Result<LockNode> {
        self.purge_stale().await?;
        let (created, session_id) = self
            .gateway
            .create_in_session(
                &path::join(&self.root, NODE_PREFIX),
                &[],
                CreateMode::EphemeralSequential,
            )
            .await?;
        debug!(node = %created, session = session_id, "Contender node created");

        match self.wait_for_turn(&created, session_id).await {
            Ok(()) => {
                self.held.insert(created.clone());
                self.counters.acquired.fetch_add(1, Ordering::Relaxed);
                counter!("keeper_lock_acquired", 1);
                gauge!("keeper_locks_held", self.held.len() as f64);
                info!(node = %created, root = %self.root, "Lock acquired");
                Ok(LockNode {
                    path: created,
                    session_id,
                    acquired_at: Utc::now(),
                })
            }
            Err(e) => {
                if !matches!(e, KeeperError::SessionExpired) {
                    self.abandon(created.clone(), session_id).await;
                }
                warn!(node = %created, error = %e, "Lock acquisition failed");
                Err(e)
            }
        }
    }

    /// Delete a contender that will never be granted, or remember it
    async fn abandon(&self, node: String, session_id: i64) {
        match self.gateway.delete(&node, None).await {
            Ok(()) => debug!(node = %node, "Contender node removed"),
            Err(e) if e.is_no_node() => {}
            Err(e) => {
                warn!(node = %node, error = %e, "Contender cleanup failed, keeping as stale");
                self.stale.insert(node, session_id);
                gauge!("keeper_lock_stale_nodes", self.stale.len() as f64);
            }
        }
    }

    /// Delete stale contender nodes left by failed acquisitions
    ///
    /// Entries owned by a session other than the gateway's current one are
    /// dropped; the service removed those nodes with their session. Returns
    /// the first delete failure, leaving that entry in place.
    pub async fn purge_stale(&self) -> Result<()> {
        if self.stale.is_empty() {
            return Ok(());
        }
        let current = self.gateway.session_id().await;
        let entries: Vec<(String, i64)> = self
            .stale
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        let mut failure = None;
        for (node, owner) in entries {
            if current != Some(owner) {
                debug!(node = %node, session = owner, "Stale contender ended with its session");
                self.stale.remove(&node);
                continue;
            }
            match self.gateway.delete(&node, None).await {
                Ok(()) => {
                    info!(node = %node, "Stale contender removed");
                    self.stale.remove(&node);
                }
                Err(e) if e.is_no_node() || matches!(e, KeeperError::SessionExpired) => {
                    self.stale.remove(&node);
                }
                Err(e) => {
                    warn!(node = %node, error = %e, "Stale contender still present");
                    failure.get_or_insert(e);
                }
            }
        }
        gauge!("keeper_lock_stale_nodes", self.stale.len() as f64);

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn wait_for_turn(&self, own_path: &str, session_id: i64) -> Result<()> {
        let own = path::file_name(own_path).to_string();

        loop {
            let children = self.gateway.get_children(&self.root).await?;
            if !children.iter().any(|c| c == &own) {
                // ephemeral node gone: the session that owned it is dead
                return Err(KeeperError::SessionExpired);
            }
            if sequence::is_minimum(&children, &own) {
                return Ok(());
            }

            let predecessor = match sequence::predecessor(&children, &own) {
                Some(name) => path::join(&self.root, name),
                None => return Err(KeeperError::Other(format!("no predecessor for {}", own))),
            };

            let handle = match self.gateway.get_data_watched(&predecessor).await {
                Ok((_, handle)) => handle,
                Err(e) if e.is_no_node() => {
                    debug!(predecessor = %predecessor, "Predecessor vanished before watch");
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.counters.waits.fetch_add(1, Ordering::Relaxed);
            counter!("keeper_lock_waits", 1);
            debug!(node = %own, predecessor = %predecessor, "Waiting on predecessor");

            match handle.wait().await {
                WatchOutcome::Fired(event) => {
                    debug!(node = %own, predecessor = %predecessor, event = ?event, "Predecessor changed");
                }
                WatchOutcome::SessionExpired => return Err(KeeperError::SessionExpired),
                WatchOutcome::Released => {
                    if self.gateway.session_id().await != Some(session_id) {
                        return Err(KeeperError::SessionExpired);
                    }
                }
            }
        }
    }

    /// Release a lock this handle holds
    ///
    /// Releasing a node not held by this handle, or releasing twice, fails
    /// with `NotHeld` and leaves the service untouched. If the node is
    /// already gone the lock was lost with its session.
    pub async fn release(&self, node: &LockNode) -> Result<()> {
        if self.held.remove(&node.path).is_none() {
            warn!(node = %node.path, "Release of lock not held");
            return Err(KeeperError::NotHeld(node.path.clone()));
        }
        gauge!("keeper_locks_held", self.held.len() as f64);

        match self.gateway.delete(&node.path, None).await {
            Ok(()) => {
                self.counters.released.fetch_add(1, Ordering::Relaxed);
                counter!("keeper_lock_released", 1);
                info!(node = %node.path, "Lock released");
                Ok(())
            }
            Err(e) if e.is_no_node() => {
                self.counters.lost.fetch_add(1, Ordering::Relaxed);
                warn!(node = %node.path, "Lock node already gone, lock was lost");
                Err(KeeperError::SessionExpired)
            }
            Err(e) => {
                // still ours until the session ends; allow another attempt
                self.held.insert(node.path.clone());
                Err(e)
            }
        }
    }
}
