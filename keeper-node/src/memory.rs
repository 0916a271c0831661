//! In-process coordination service.
//!
//! Implements the subset of ZooKeeper semantics the client relies on:
//! sessions bound to an endpoint, persistent/ephemeral/sequential nodes,
//! one-shot data/exists/child watches delivered on the session's ordered
//! event channel, and session expiry removing ephemeral nodes. Endpoints can
//! be taken down or stalled to exercise failover.

use async_trait::async_trait;
use keeper_common::{path, sequence, CreateMode, Endpoint, EventKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{KeeperError, OpFailure, Result};
use crate::transport::{Connection, SessionEvent, SessionOps, SessionState, Transport};

/// How an endpoint of the in-process service behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    /// Probes and handshakes succeed
    Up,
    /// Probes fail and connections are refused
    Down,
    /// Probes succeed but the session handshake never completes
    Stalled,
}

#[derive(Debug)]
struct MemNode {
    data: Vec<u8>,
    version: i32,
    ephemeral_owner: Option<i64>,
    next_sequence: u64,
}

impl MemNode {
    fn new(data: Vec<u8>, ephemeral_owner: Option<i64>) -> Self {
        Self {
            data,
            version: 0,
            ephemeral_owner,
            next_sequence: 0,
        }
    }
}

#[derive(Debug)]
struct MemSession {
    endpoint: Endpoint,
    events: mpsc::UnboundedSender<SessionEvent>,
}

#[derive(Debug, Default)]
struct ServiceState {
    nodes: BTreeMap<String, MemNode>,
    sessions: HashMap<i64, MemSession>,
    next_session: i64,
    endpoints: HashMap<Endpoint, EndpointMode>,
    connect_attempts: HashMap<Endpoint, usize>,
    probes: HashMap<Endpoint, usize>,
    data_watches: HashMap<String, BTreeSet<i64>>,
    exist_watches: HashMap<String, BTreeSet<i64>>,
    child_watches: HashMap<String, BTreeSet<i64>>,
}

impl ServiceState {
    fn mode(&self, endpoint: &Endpoint) -> EndpointMode {
        self.endpoints
            .get(endpoint)
            .copied()
            .unwrap_or(EndpointMode::Up)
    }

    fn children_of(&self, parent: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|key| key.as_str() != "/" && path::parent(key).as_deref() == Some(parent))
            .map(|key| path::file_name(key).to_string())
            .collect()
    }

    fn has_children(&self, parent: &str) -> bool {
        self.nodes
            .keys()
            .any(|key| key.as_str() != "/" && path::parent(key).as_deref() == Some(parent))
    }

    fn send(&self, session: i64, event: SessionEvent) {
        if let Some(s) = self.sessions.get(&session) {
            let _ = s.events.send(event);
        }
    }

    /// Fire and clear one-shot watches for a change to `node`
    fn trigger(&mut self, node: &str, kind: EventKind) {
        let mut targets = BTreeSet::new();
        match kind {
            EventKind::NodeCreated => {
                targets.extend(self.exist_watches.remove(node).unwrap_or_default());
            }
            EventKind::NodeDataChanged => {
                targets.extend(self.data_watches.remove(node).unwrap_or_default());
                targets.extend(self.exist_watches.remove(node).unwrap_or_default());
            }
            EventKind::NodeDeleted => {
                targets.extend(self.data_watches.remove(node).unwrap_or_default());
                targets.extend(self.exist_watches.remove(node).unwrap_or_default());
                targets.extend(self.child_watches.remove(node).unwrap_or_default());
            }
            EventKind::NodeChildrenChanged => {
                targets.extend(self.child_watches.remove(node).unwrap_or_default());
            }
        }

        for session in targets {
            self.send(
                session,
                SessionEvent::Node {
                    kind,
                    path: node.to_string(),
                },
            );
        }
    }

    fn remove_node(&mut self, node: &str) {
        self.nodes.remove(node);
        self.trigger(node, EventKind::NodeDeleted);
        if let Some(parent) = path::parent(node) {
            self.trigger(&parent, EventKind::NodeChildrenChanged);
        }
    }

    /// Drop a session: forget its watches and delete its ephemeral nodes
    fn end_session(&mut self, session: i64) {
        if self.sessions.remove(&session).is_none() {
            return;
        }

        for watchers in self
            .data_watches
            .values_mut()
            .chain(self.exist_watches.values_mut())
            .chain(self.child_watches.values_mut())
        {
            watchers.remove(&session);
        }

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.ephemeral_owner == Some(session))
            .map(|(key, _)| key.clone())
            .collect();

        for node in owned.iter().rev() {
            self.remove_node(node);
        }

        debug!(session, ephemerals = owned.len(), "Session ended");
    }
}

/// Shared handle to an in-process coordination service
#[derive(Debug, Clone)]
pub struct MemoryService {
    state: Arc<Mutex<ServiceState>>,
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryService {
    pub fn new() -> Self {
        let mut state = ServiceState::default();
        state.nodes.insert("/".to_string(), MemNode::new(Vec::new(), None));
        state.next_session = 0x1000;
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Change how an endpoint behaves; taking it down disconnects its sessions
    pub fn set_endpoint_mode(&self, endpoint: &Endpoint, mode: EndpointMode) {
        let mut state = self.lock();
        state.endpoints.insert(endpoint.clone(), mode);
        info!(endpoint = %endpoint, mode = ?mode, "Endpoint mode changed");

        if mode == EndpointMode::Down {
            let affected: Vec<i64> = state
                .sessions
                .iter()
                .filter(|(_, s)| &s.endpoint == endpoint)
                .map(|(id, _)| *id)
                .collect();
            for session in affected {
                state.send(session, SessionEvent::State(SessionState::Disconnected));
            }
        }
    }

    /// Expire a session as the service would after missed heartbeats
    pub fn expire_session(&self, session: i64) {
        let mut state = self.lock();
        warn!(session, "Expiring session");
        state.send(session, SessionEvent::State(SessionState::Expired));
        state.end_session(session);
    }

    /// Live sessions bound to an endpoint
    pub fn sessions_on(&self, endpoint: &Endpoint) -> Vec<i64> {
        let state = self.lock();
        let mut ids: Vec<i64> = state
            .sessions
            .iter()
            .filter(|(_, s)| &s.endpoint == endpoint)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn connect_attempts(&self, endpoint: &Endpoint) -> usize {
        self.lock()
            .connect_attempts
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn probe_count(&self, endpoint: &Endpoint) -> usize {
        self.lock().probes.get(endpoint).copied().unwrap_or(0)
    }

    /// Whether a physical path exists
    pub fn node_exists(&self, node: &str) -> bool {
        self.lock().nodes.contains_key(node)
    }

    /// Child names of a physical path, sorted
    pub fn node_children(&self, node: &str) -> Vec<String> {
        let mut children = self.lock().children_of(node);
        children.sort();
        children
    }

    pub fn node_data(&self, node: &str) -> Option<Vec<u8>> {
        self.lock().nodes.get(node).map(|n| n.data.clone())
    }

    /// Session owning an ephemeral node
    pub fn node_owner(&self, node: &str) -> Option<i64> {
        self.lock().nodes.get(node).and_then(|n| n.ephemeral_owner)
    }

    /// Number of server-side watches held for a session
    pub fn watch_count(&self, session: i64) -> usize {
        let state = self.lock();
        state
            .data_watches
            .values()
            .chain(state.exist_watches.values())
            .chain(state.child_watches.values())
            .filter(|watchers| watchers.contains(&session))
            .count()
    }
}

#[async_trait]
impl Transport for MemoryService {
    async fn probe(&self, endpoint: &Endpoint, _timeout: Duration) -> bool {
        let mut state = self.lock();
        *state.probes.entry(endpoint.clone()).or_insert(0) += 1;
        state.mode(endpoint) != EndpointMode::Down
    }

    async fn connect(&self, endpoint: &Endpoint, _session_timeout: Duration) -> Result<Connection> {
        let mut state = self.lock();
        *state.connect_attempts.entry(endpoint.clone()).or_insert(0) += 1;

        let mode = state.mode(endpoint);
        if mode == EndpointMode::Down {
            return Err(KeeperError::Transport(format!(
                "connection to {} refused",
                endpoint
            )));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = state.next_session;
        state.next_session += 1;

        if mode == EndpointMode::Up {
            let _ = sender.send(SessionEvent::State(SessionState::Connected));
        }

        state.sessions.insert(
            id,
            MemSession {
                endpoint: endpoint.clone(),
                events: sender,
            },
        );
        debug!(endpoint = %endpoint, session = id, "Session opened");

        Ok(Connection {
            ops: Arc::new(MemorySession {
                service: self.clone(),
                id,
            }),
            events: receiver,
        })
    }
}

/// Operations bound to one session of a `MemoryService`
#[derive(Debug)]
pub struct MemorySession {
    service: MemoryService,
    id: i64,
}

impl MemorySession {
    /// Lock the service state, failing if this session is not usable
    fn live(&self) -> Result<MutexGuard<'_, ServiceState>> {
        let state = self.service.lock();
        let endpoint = match state.sessions.get(&self.id) {
            Some(session) => session.endpoint.clone(),
            None => return Err(KeeperError::SessionExpired),
        };
        match state.mode(&endpoint) {
            EndpointMode::Up => Ok(state),
            _ => Err(KeeperError::Transport(format!(
                "connection to {} lost",
                endpoint
            ))),
        }
    }
}

#[async_trait]
impl SessionOps for MemorySession {
    fn session_id(&self) -> i64 {
        self.id
    }

    async fn create(&self, node: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        let mut state = self.live()?;

        let parent = path::parent(node)
            .ok_or_else(|| KeeperError::op("create", node, OpFailure::NodeExists))?;
        let created = {
            let parent_node = state
                .nodes
                .get_mut(&parent)
                .ok_or_else(|| KeeperError::op("create", node, OpFailure::NoNode))?;
            if parent_node.ephemeral_owner.is_some() {
                return Err(KeeperError::op(
                    "create",
                    node,
                    OpFailure::NoChildrenForEphemerals,
                ));
            }
            if mode.is_sequential() {
                let counter = parent_node.next_sequence;
                parent_node.next_sequence += 1;
                format!("{}{}", node, sequence::format(counter))
            } else {
                node.to_string()
            }
        };

        if state.nodes.contains_key(&created) {
            return Err(KeeperError::op("create", created, OpFailure::NodeExists));
        }

        let owner = if mode.is_ephemeral() { Some(self.id) } else { None };
        state
            .nodes
            .insert(created.clone(), MemNode::new(data.to_vec(), owner));
        state.trigger(&created, EventKind::NodeCreated);
        state.trigger(&parent, EventKind::NodeChildrenChanged);

        Ok(created)
    }

    async fn delete(&self, node: &str, version: Option<i32>) -> Result<()> {
        let mut state = self.live()?;

        let current = state
            .nodes
            .get(node)
            .map(|n| n.version)
            .ok_or_else(|| KeeperError::op("delete", node, OpFailure::NoNode))?;
        if let Some(expected) = version {
            if expected != current {
                return Err(KeeperError::op("delete", node, OpFailure::BadVersion));
            }
        }
        if node == "/" || state.has_children(node) {
            return Err(KeeperError::op("delete", node, OpFailure::NotEmpty));
        }

        state.remove_node(node);
        Ok(())
    }

    async fn exists(&self, node: &str, watch: bool) -> Result<bool> {
        let mut state = self.live()?;
        if watch {
            state
                .exist_watches
                .entry(node.to_string())
                .or_default()
                .insert(self.id);
        }
        Ok(state.nodes.contains_key(node))
    }

    async fn get_children(&self, node: &str, watch: bool) -> Result<Vec<String>> {
        let mut state = self.live()?;
        if !state.nodes.contains_key(node) {
            return Err(KeeperError::op("get_children", node, OpFailure::NoNode));
        }
        if watch {
            state
                .child_watches
                .entry(node.to_string())
                .or_default()
                .insert(self.id);
        }
        Ok(state.children_of(node))
    }

    async fn get_data(&self, node: &str, watch: bool) -> Result<Vec<u8>> {
        let mut state = self.live()?;
        let data = state
            .nodes
            .get(node)
            .map(|n| n.data.clone())
            .ok_or_else(|| KeeperError::op("get_data", node, OpFailure::NoNode))?;
        if watch {
            state
                .data_watches
                .entry(node.to_string())
                .or_default()
                .insert(self.id);
        }
        Ok(data)
    }

    async fn set_data(&self, node: &str, data: &[u8], version: Option<i32>) -> Result<()> {
        let mut state = self.live()?;
        {
            let target = state
                .nodes
                .get_mut(node)
                .ok_or_else(|| KeeperError::op("set_data", node, OpFailure::NoNode))?;
            if let Some(expected) = version {
                if expected != target.version {
                    return Err(KeeperError::op("set_data", node, OpFailure::BadVersion));
                }
            }
            target.data = data.to_vec();
            target.version += 1;
        }
        state.trigger(node, EventKind::NodeDataChanged);
        Ok(())
    }

    async fn close(&self) {
        self.service.lock().end_session(self.id);
    }
}
