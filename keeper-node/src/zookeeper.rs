//! ZooKeeper transport over `tokio-zookeeper`.
//!
//! The client library completes the session handshake inside `connect`, so
//! `Connected` is emitted on the event channel as soon as it returns. Watch
//! firings and keeper-state changes arrive on the library's default watcher
//! stream and are forwarded in order.

use async_trait::async_trait;
use futures::StreamExt;
use keeper_common::{CreateMode, Endpoint, EventKind};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_zookeeper::{
    error as zk_error, Acl, KeeperState, WatchedEvent, WatchedEventType, ZooKeeper,
    ZooKeeperBuilder,
};
use tracing::{debug, info, warn};

use crate::error::{KeeperError, OpFailure, Result};
use crate::transport::{self, Connection, SessionEvent, SessionOps, SessionState, Transport};

static NEXT_SESSION: AtomicI64 = AtomicI64::new(1);

/// Transport that talks to a real ZooKeeper ensemble
#[derive(Debug, Default, Clone)]
pub struct ZkTransport;

impl ZkTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ZkTransport {
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> bool {
        transport::tcp_probe(endpoint, timeout).await
    }

    async fn connect(&self, endpoint: &Endpoint, session_timeout: Duration) -> Result<Connection> {
        let addr = tokio::net::lookup_host((endpoint.host(), endpoint.port()))
            .await?
            .next()
            .ok_or_else(|| KeeperError::Transport(format!("{} did not resolve", endpoint)))?;

        let mut builder = ZooKeeperBuilder::default();
        builder.set_timeout(session_timeout);
        let (zk, watcher) = builder
            .connect(&addr)
            .await
            .map_err(|e| KeeperError::Transport(format!("connect to {}: {}", endpoint, e)))?;

        let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        info!(endpoint = %endpoint, session = id, "ZooKeeper session established");

        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(SessionEvent::State(SessionState::Connected));

        let label = endpoint.to_string();
        tokio::spawn(async move {
            let mut watcher = Box::pin(watcher);
            while let Some(event) = watcher.next().await {
                let event = translate(event);
                debug!(endpoint = %label, event = ?event, "ZooKeeper event");
                if sender.send(event).is_err() {
                    return;
                }
            }
            warn!(endpoint = %label, "ZooKeeper event stream ended");
            let _ = sender.send(SessionEvent::State(SessionState::Disconnected));
        });

        Ok(Connection {
            ops: Arc::new(ZkSession {
                id,
                zk: tokio::sync::Mutex::new(Some(zk)),
            }),
            events: receiver,
        })
    }
}

fn translate(event: WatchedEvent) -> SessionEvent {
    let kind = match event.event_type {
        WatchedEventType::NodeCreated => Some(EventKind::NodeCreated),
        WatchedEventType::NodeDeleted => Some(EventKind::NodeDeleted),
        WatchedEventType::NodeDataChanged => Some(EventKind::NodeDataChanged),
        WatchedEventType::NodeChildrenChanged => Some(EventKind::NodeChildrenChanged),
        _ => None,
    };

    match kind {
        Some(kind) => SessionEvent::Node {
            kind,
            path: event.path,
        },
        None => SessionEvent::State(match event.keeper_state {
            KeeperState::SyncConnected | KeeperState::ConnectedReadOnly => SessionState::Connected,
            KeeperState::Expired => SessionState::Expired,
            _ => SessionState::Disconnected,
        }),
    }
}

fn to_zk_mode(mode: CreateMode) -> tokio_zookeeper::CreateMode {
    match mode {
        CreateMode::Persistent => tokio_zookeeper::CreateMode::Persistent,
        CreateMode::Ephemeral => tokio_zookeeper::CreateMode::Ephemeral,
        CreateMode::PersistentSequential => tokio_zookeeper::CreateMode::PersistentSequential,
        CreateMode::EphemeralSequential => tokio_zookeeper::CreateMode::EphemeralSequential,
    }
}

fn transport_err(op: &str, path: &str, err: impl std::fmt::Display) -> KeeperError {
    KeeperError::Transport(format!("{} {}: {}", op, path, err))
}

fn other<E: Debug>(err: E) -> OpFailure {
    OpFailure::Other(format!("{:?}", err))
}

/// One ZooKeeper session
pub struct ZkSession {
    id: i64,
    zk: tokio::sync::Mutex<Option<ZooKeeper>>,
}

impl ZkSession {
    async fn client(&self) -> Result<ZooKeeper> {
        self.zk
            .lock()
            .await
            .as_ref()
            .cloned()
            .ok_or(KeeperError::SessionExpired)
    }
}

#[async_trait]
impl SessionOps for ZkSession {
    fn session_id(&self) -> i64 {
        self.id
    }

    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        let zk = self.client().await?;
        match zk
            .create(path, data.to_vec(), Acl::open_unsafe(), to_zk_mode(mode))
            .await
        {
            Ok(Ok(created)) => Ok(created),
            Ok(Err(e)) => Err(KeeperError::op(
                "create",
                path,
                match e {
                    zk_error::Create::NodeExists { .. } => OpFailure::NodeExists,
                    zk_error::Create::NoNode { .. } => OpFailure::NoNode,
                    zk_error::Create::NoChildrenForEphemerals { .. } => {
                        OpFailure::NoChildrenForEphemerals
                    }
                    other_err => other(other_err),
                },
            )),
            Err(e) => Err(transport_err("create", path, e)),
        }
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<()> {
        let zk = self.client().await?;
        match zk.delete(path, version).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(KeeperError::op(
                "delete",
                path,
                match e {
                    zk_error::Delete::NoNode { .. } => OpFailure::NoNode,
                    zk_error::Delete::NotEmpty { .. } => OpFailure::NotEmpty,
                    zk_error::Delete::BadVersion { .. } => OpFailure::BadVersion,
                    other_err => other(other_err),
                },
            )),
            Err(e) => Err(transport_err("delete", path, e)),
        }
    }

    async fn exists(&self, path: &str, watch: bool) -> Result<bool> {
        let zk = self.client().await?;
        let stat = if watch {
            zk.watch().exists(path).await
        } else {
            zk.exists(path).await
        };
        stat.map(|s| s.is_some())
            .map_err(|e| transport_err("exists", path, e))
    }

    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>> {
        let zk = self.client().await?;
        let children = if watch {
            zk.watch().get_children(path).await
        } else {
            zk.get_children(path).await
        };
        match children {
            Ok(Some(children)) => Ok(children),
            Ok(None) => Err(KeeperError::op("get_children", path, OpFailure::NoNode)),
            Err(e) => Err(transport_err("get_children", path, e)),
        }
    }

    async fn get_data(&self, path: &str, watch: bool) -> Result<Vec<u8>> {
        let zk = self.client().await?;
        let data = if watch {
            zk.watch().get_data(path).await
        } else {
            zk.get_data(path).await
        };
        match data {
            Ok(Some((data, _stat))) => Ok(data),
            Ok(None) => Err(KeeperError::op("get_data", path, OpFailure::NoNode)),
            Err(e) => Err(transport_err("get_data", path, e)),
        }
    }

    async fn set_data(&self, path: &str, data: &[u8], version: Option<i32>) -> Result<()> {
        let zk = self.client().await?;
        match zk.set_data(path, version, data.to_vec()).await {
            Ok(Ok(_stat)) => Ok(()),
            Ok(Err(e)) => Err(KeeperError::op(
                "set_data",
                path,
                match e {
                    zk_error::SetData::NoNode { .. } => OpFailure::NoNode,
                    zk_error::SetData::BadVersion { .. } => OpFailure::BadVersion,
                    other_err => other(other_err),
                },
            )),
            Err(e) => Err(transport_err("set_data", path, e)),
        }
    }

    async fn close(&self) {
        // dropping the last handle closes the connection
        if self.zk.lock().await.take().is_some() {
            debug!(session = self.id, "ZooKeeper session closed");
        }
    }
}
