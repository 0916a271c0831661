//! Session gateway: owns the single live session and exposes namespaced node
//! operations.
//!
//! Every operation runs under the read side of the session lock; connect and
//! disconnect take the write side, so a teardown waits for in-flight calls
//! and excludes new ones. Notifications from the session are demultiplexed
//! by one dispatcher task: state changes feed a `watch` channel, node events
//! are routed to the [`WatchRegistry`].

use keeper_common::{path, CreateMode, Endpoint, WatchKind};
use metrics::counter;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::config::KeeperConfig;
use crate::error::{KeeperError, Result};
use crate::transport::{SessionEvent, SessionOps, SessionState, Transport};
use crate::watch::{WatchHandle, WatchRegistry};

/// Longest single backoff between operation retries
const MAX_RETRY_SLEEP: Duration = Duration::from_secs(30);

/// Settings the gateway applies to every session it opens
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub namespace: String,
    pub session_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub base_sleep: Duration,
    /// Node created under the namespace on every connect, with its data
    pub root: Option<(String, Vec<u8>)>,
}

impl GatewaySettings {
    pub fn from_config(config: &KeeperConfig) -> Self {
        let zk = &config.zookeeper;
        Self {
            namespace: zk.namespace.clone(),
            session_timeout: zk.session_timeout(),
            connect_timeout: zk.connect_timeout(),
            max_retries: zk.max_retries,
            base_sleep: zk.base_sleep(),
            root: Some((
                path::normalize(&config.lock.root),
                config.lock.root_data.clone().into_bytes(),
            )),
        }
    }

    /// Backoff before retry number `attempt` (zero based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_sleep
            .checked_mul(factor)
            .map_or(MAX_RETRY_SLEEP, |d| d.min(MAX_RETRY_SLEEP))
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&KeeperConfig::default())
    }
}

struct ActiveSession {
    endpoint: Endpoint,
    ops: Arc<dyn SessionOps>,
    dispatcher: JoinHandle<()>,
}

/// Sole owner of the coordination-service session
pub struct SessionGateway {
    transport: Arc<dyn Transport>,
    settings: GatewaySettings,
    slot: RwLock<Option<ActiveSession>>,
    state: Arc<watch::Sender<SessionState>>,
    registry: Arc<WatchRegistry>,
    generation: Arc<AtomicU64>,
}

impl SessionGateway {
    pub fn new(transport: Arc<dyn Transport>, settings: GatewaySettings) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            transport,
            settings,
            slot: RwLock::new(None),
            state: Arc::new(state),
            registry: Arc::new(WatchRegistry::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Endpoint of the current session, if any
    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.slot.read().await.as_ref().map(|s| s.endpoint.clone())
    }

    pub async fn session_id(&self) -> Option<i64> {
        self.slot.read().await.as_ref().map(|s| s.ops.session_id())
    }

    /// Replace any current session with a new one on `endpoint`
    ///
    /// Fails with `ConnectTimeout` if the service does not signal `Connected`
    /// within the connect timeout. On success the namespace and configured
    /// root node exist.
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<()> {
        let mut slot = self.slot.write().await;
        if let Some(old) = slot.take() {
            self.teardown(old).await;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + self.settings.connect_timeout;
        self.state.send_replace(SessionState::Connecting);
        counter!("keeper_connect_attempts", 1);
        info!(endpoint = %endpoint, "Opening session");

        let connection =
            match timeout_at(deadline, self.transport.connect(endpoint, self.settings.session_timeout))
                .await
            {
                Ok(Ok(connection)) => connection,
                Ok(Err(e)) => {
                    self.state.send_replace(SessionState::Disconnected);
                    return Err(e);
                }
                Err(_) => {
                    self.state.send_replace(SessionState::Disconnected);
                    return Err(self.timeout_error(endpoint));
                }
            };

        let mut state_rx = self.state.subscribe();
        let dispatcher = tokio::spawn(dispatch(
            connection.events,
            Arc::clone(&self.generation),
            generation,
            Arc::clone(&self.state),
            Arc::clone(&self.registry),
            self.settings.namespace.clone(),
            endpoint.clone(),
        ));

        let ready = timeout_at(deadline, async {
            loop {
                match *state_rx.borrow_and_update() {
                    SessionState::Connected => return Ok(()),
                    SessionState::Expired => return Err(KeeperError::SessionExpired),
                    _ => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(KeeperError::NotConnected);
                }
            }
        })
        .await;

        let failure = match ready {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(self.timeout_error(endpoint)),
        };

        let session = ActiveSession {
            endpoint: endpoint.clone(),
            ops: connection.ops,
            dispatcher,
        };

        if let Some(e) = failure {
            warn!(endpoint = %endpoint, error = %e, "Session handshake failed");
            self.teardown(session).await;
            return Err(e);
        }

        if let Err(e) = self.prepare(session.ops.as_ref()).await {
            error!(endpoint = %endpoint, error = %e, "Failed to prepare namespace");
            self.teardown(session).await;
            return Err(e);
        }

        info!(
            endpoint = %endpoint,
            session = session.ops.session_id(),
            namespace = %self.settings.namespace,
            "Session established"
        );
        counter!("keeper_sessions_established", 1);
        *slot = Some(session);
        Ok(())
    }

    /// Tear down the current session, draining the watch registry first
    pub async fn disconnect(&self) {
        let mut slot = self.slot.write().await;
        match slot.take() {
            Some(session) => {
                info!(endpoint = %session.endpoint, "Closing session");
                self.teardown(session).await;
            }
            None => debug!("Disconnect with no session"),
        }
    }

    async fn teardown(&self, session: ActiveSession) {
        self.registry.release_all();
        self.generation.fetch_add(1, Ordering::SeqCst);
        session.dispatcher.abort();
        session.ops.close().await;
        self.state.send_replace(SessionState::Disconnected);
    }

    fn timeout_error(&self, endpoint: &Endpoint) -> KeeperError {
        KeeperError::ConnectTimeout {
            endpoint: endpoint.to_string(),
            timeout_ms: self.settings.connect_timeout.as_millis() as u64,
        }
    }

    /// Create the namespace node and the configured root on a fresh session
    async fn prepare(&self, ops: &dyn SessionOps) -> Result<()> {
        let namespace = path::with_namespace(&self.settings.namespace, "/");
        if namespace != "/" {
            ensure_node(ops, &namespace, &[]).await?;
        }
        if let Some((root, data)) = &self.settings.root {
            self.ensure_physical(ops, &self.physical(root), data).await?;
        }
        Ok(())
    }

    /// Create `full` and any missing ancestors, tolerating concurrent creators
    async fn ensure_physical(&self, ops: &dyn SessionOps, full: &str, data: &[u8]) -> Result<()> {
        for ancestor in path::ancestors(full) {
            let payload: &[u8] = if ancestor == full { data } else { &[] };
            ensure_node(ops, &ancestor, payload).await?;
        }
        Ok(())
    }

    fn physical(&self, logical: &str) -> String {
        path::with_namespace(&self.settings.namespace, logical)
    }

    fn logical(&self, physical: &str) -> String {
        path::strip_namespace(&self.settings.namespace, physical)
            .unwrap_or_else(|| physical.to_string())
    }

    /// Run `f` against the live session, retrying transient failures
    async fn run<T, F, Fut>(&self, op: &'static str, full: &str, retry: bool, f: F) -> Result<T>
    where
        F: Fn(Arc<dyn SessionOps>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_in_session(op, full, retry, f)
            .await
            .map(|(value, _)| value)
    }

    /// As [`Self::run`], also yielding the id of the session that succeeded
    async fn run_in_session<T, F, Fut>(
        &self,
        op: &'static str,
        full: &str,
        retry: bool,
        f: F,
    ) -> Result<(T, i64)>
    where
        F: Fn(Arc<dyn SessionOps>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = {
                let slot = self.slot.read().await;
                let session = slot.as_ref().ok_or(KeeperError::NotConnected)?;
                if self.state() == SessionState::Expired {
                    return Err(KeeperError::SessionExpired);
                }
                let id = session.ops.session_id();
                f(Arc::clone(&session.ops)).await.map(|value| (value, id))
            };

            match result {
                Err(e) if retry && e.is_transient() && attempt < self.settings.max_retries => {
                    let delay = self.settings.retry_delay(attempt);
                    attempt += 1;
                    warn!(
                        op,
                        path = %full,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying operation"
                    );
                    counter!("keeper_op_retries", 1);
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Ensure a persistent node exists, creating ancestors as needed
    ///
    /// Concurrent callers racing on the same path both succeed.
    pub async fn ensure_root(&self, root: &str, data: &[u8]) -> Result<()> {
        let full = self.physical(root);
        let p = full.as_str();
        self.run("ensure_root", p, true, move |ops| async move {
            for ancestor in path::ancestors(p) {
                let payload: &[u8] = if ancestor == p { data } else { &[] };
                ensure_node(ops.as_ref(), &ancestor, payload).await?;
            }
            Ok(())
        })
        .await
    }

    /// Ensure a node and its ancestors exist, with empty data
    pub async fn ensure_path(&self, node: &str) -> Result<()> {
        self.ensure_root(node, &[]).await
    }

    /// Create a node; returns the logical path actually assigned
    pub async fn create(&self, node: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        self.create_in_session(node, data, mode)
            .await
            .map(|(created, _)| created)
    }

    /// Create a node and report the session it was created in
    ///
    /// An ephemeral node belongs to that session even if the gateway has
    /// moved to another one by the time the caller looks.
    pub async fn create_in_session(
        &self,
        node: &str,
        data: &[u8],
        mode: CreateMode,
    ) -> Result<(String, i64)> {
        let full = self.physical(node);
        let p = full.as_str();
        // a retried sequential create could leave an orphan sibling behind
        let retry = !mode.is_sequential();
        let (created, session) = self
            .run_in_session("create", p, retry, move |ops| async move {
                ops.create(p, data, mode).await
            })
            .await?;
        Ok((self.logical(&created), session))
    }

    pub async fn delete(&self, node: &str, version: Option<i32>) -> Result<()> {
        let full = self.physical(node);
        let p = full.as_str();
        self.run("delete", p, true, move |ops| async move {
            ops.delete(p, version).await
        })
        .await
    }

    pub async fn exists(&self, node: &str) -> Result<bool> {
        let full = self.physical(node);
        let p = full.as_str();
        self.run("exists", p, true, move |ops| async move {
            ops.exists(p, false).await
        })
        .await
    }

    pub async fn get_children(&self, node: &str) -> Result<Vec<String>> {
        let full = self.physical(node);
        let p = full.as_str();
        self.run("get_children", p, true, move |ops| async move {
            ops.get_children(p, false).await
        })
        .await
    }

    pub async fn get_data(&self, node: &str) -> Result<Vec<u8>> {
        let full = self.physical(node);
        let p = full.as_str();
        self.run("get_data", p, true, move |ops| async move {
            ops.get_data(p, false).await
        })
        .await
    }

    pub async fn set_data(&self, node: &str, data: &[u8]) -> Result<()> {
        let full = self.physical(node);
        let p = full.as_str();
        self.run("set_data", p, true, move |ops| async move {
            ops.set_data(p, data, None).await
        })
        .await
    }

    /// Read a node and arm a one-shot data watch on it
    ///
    /// The watch is recorded in the registry before it is armed, so a firing
    /// can never arrive ahead of its entry.
    pub async fn get_data_watched(&self, node: &str) -> Result<(Vec<u8>, WatchHandle)> {
        let logical = path::normalize(node);
        let handle = self.registry.register(&logical, WatchKind::Data);
        let full = self.physical(&logical);
        let p = full.as_str();
        match self
            .run("get_data", p, true, move |ops| async move {
                ops.get_data(p, true).await
            })
            .await
        {
            Ok(data) => Ok((data, handle)),
            Err(e) => {
                self.registry.cancel(&handle);
                Err(e)
            }
        }
    }

    /// Check existence and arm a one-shot exists watch
    pub async fn exists_watched(&self, node: &str) -> Result<(bool, WatchHandle)> {
        let logical = path::normalize(node);
        let handle = self.registry.register(&logical, WatchKind::Exists);
        let full = self.physical(&logical);
        let p = full.as_str();
        match self
            .run("exists", p, true, move |ops| async move {
                ops.exists(p, true).await
            })
            .await
        {
            Ok(found) => Ok((found, handle)),
            Err(e) => {
                self.registry.cancel(&handle);
                Err(e)
            }
        }
    }

    /// List children and arm a one-shot child watch
    pub async fn get_children_watched(&self, node: &str) -> Result<(Vec<String>, WatchHandle)> {
        let logical = path::normalize(node);
        let handle = self.registry.register(&logical, WatchKind::Children);
        let full = self.physical(&logical);
        let p = full.as_str();
        match self
            .run("get_children", p, true, move |ops| async move {
                ops.get_children(p, true).await
            })
            .await
        {
            Ok(children) => Ok((children, handle)),
            Err(e) => {
                self.registry.cancel(&handle);
                Err(e)
            }
        }
    }

    /// Stop tracking watches on a logical path; waiters see `Released`
    pub fn release_watch(&self, node: &str) {
        self.registry.release(&path::normalize(node));
    }
}

async fn ensure_node(ops: &dyn SessionOps, full: &str, data: &[u8]) -> Result<()> {
    if ops.exists(full, false).await? {
        return Ok(());
    }
    match ops.create(full, data, CreateMode::Persistent).await {
        Ok(_) => {
            debug!(path = %full, "Created node");
            Ok(())
        }
        Err(e) if e.is_node_exists() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Route one session's notifications until it ends or is superseded
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    generation: Arc<AtomicU64>,
    own: u64,
    state: Arc<watch::Sender<SessionState>>,
    registry: Arc<WatchRegistry>,
    namespace: String,
    endpoint: Endpoint,
) {
    while let Some(event) = events.recv().await {
        if generation.load(Ordering::SeqCst) != own {
            debug!(endpoint = %endpoint, "Dropping event from superseded session");
            return;
        }

        match event {
            SessionEvent::State(next) => {
                match next {
                    SessionState::Connected => debug!(endpoint = %endpoint, "Session connected"),
                    SessionState::Connecting => debug!(endpoint = %endpoint, "Session connecting"),
                    SessionState::Disconnected => {
                        warn!(endpoint = %endpoint, "Session disconnected")
                    }
                    SessionState::Expired => {
                        error!(endpoint = %endpoint, "Session expired");
                        counter!("keeper_sessions_expired", 1);
                    }
                }
                state.send_replace(next);
                if next == SessionState::Expired {
                    registry.expire_all();
                }
            }
            SessionEvent::Node { kind, path: full } => {
                match path::strip_namespace(&namespace, &full) {
                    Some(logical) => {
                        let woken = registry.fire(&logical, kind);
                        debug!(path = %logical, event = ?kind, woken, "Watch event");
                    }
                    None => debug!(path = %full, "Event outside namespace ignored"),
                }
            }
        }
    }

    if generation.load(Ordering::SeqCst) == own && *state.borrow() == SessionState::Connected {
        warn!(endpoint = %endpoint, "Session event stream closed");
        state.send_replace(SessionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EndpointMode, MemoryService};
    use crate::watch::WatchOutcome;
    use keeper_common::EventKind;

    fn settings(namespace: &str) -> GatewaySettings {
        GatewaySettings {
            namespace: namespace.to_string(),
            session_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(200),
            max_retries: 2,
            base_sleep: Duration::from_millis(10),
            root: Some(("/locks".to_string(), b"locks".to_vec())),
        }
    }

    fn ep(host: &str) -> Endpoint {
        Endpoint::new(host, 2181)
    }

    async fn connected(service: &MemoryService, namespace: &str) -> SessionGateway {
        let gateway = SessionGateway::new(Arc::new(service.clone()), settings(namespace));
        gateway.connect(&ep("zk-a")).await.unwrap();
        gateway
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let s = settings("ns");
        assert_eq!(s.retry_delay(0), Duration::from_millis(10));
        assert_eq!(s.retry_delay(1), Duration::from_millis(20));
        assert_eq!(s.retry_delay(3), Duration::from_millis(80));
        assert_eq!(s.retry_delay(40), MAX_RETRY_SLEEP);
    }

    proptest::proptest! {
        #[test]
        fn test_retry_delay_bounded(base_ms in 1u64..10_000, attempt in 0u32..64) {
            let mut s = settings("ns");
            s.base_sleep = Duration::from_millis(base_ms);
            let delay = s.retry_delay(attempt);
            proptest::prop_assert!(delay <= MAX_RETRY_SLEEP);
            proptest::prop_assert!(delay >= s.base_sleep.min(MAX_RETRY_SLEEP));
            proptest::prop_assert!(s.retry_delay(attempt + 1) >= delay);
        }
    }

    #[tokio::test]
    async fn test_connect_prepares_namespace_and_root() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;

        assert!(gateway.is_connected());
        assert!(service.node_exists("/app"));
        assert_eq!(service.node_data("/app/locks"), Some(b"locks".to_vec()));
        assert_eq!(gateway.endpoint().await, Some(ep("zk-a")));
    }

    #[tokio::test]
    async fn test_operations_are_namespaced() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;

        let created = gateway
            .create("/locks/seq-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        assert_eq!(created, "/locks/seq-0000000000");
        assert!(service.node_exists("/app/locks/seq-0000000000"));
        assert_eq!(
            gateway.get_children("locks").await.unwrap(),
            vec!["seq-0000000000".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_reports_owning_session() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;
        let first = gateway.session_id().await.unwrap();

        let (created, owner) = gateway
            .create_in_session("/locks/seq-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        assert_eq!(owner, first);
        assert_eq!(service.node_owner(&format!("/app{}", created)), Some(first));

        gateway.connect(&ep("zk-b")).await.unwrap();
        let (created, owner) = gateway
            .create_in_session("/locks/seq-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        assert_ne!(owner, first);
        assert_eq!(gateway.session_id().await, Some(owner));
        assert_eq!(service.node_owner(&format!("/app{}", created)), Some(owner));
    }

    #[tokio::test]
    async fn test_ensure_root_creates_ancestors() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;

        gateway.ensure_root("/a/b/c", b"leaf").await.unwrap();
        gateway.ensure_root("/a/b/c", b"other").await.unwrap();
        assert_eq!(service.node_data("/app/a/b/c"), Some(b"leaf".to_vec()));
        assert_eq!(service.node_data("/app/a"), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_operations_without_session() {
        let gateway = SessionGateway::new(Arc::new(MemoryService::new()), settings("app"));
        let err = gateway.exists("/locks").await.unwrap_err();
        assert!(matches!(err, KeeperError::NotConnected));
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out() {
        let service = MemoryService::new();
        service.set_endpoint_mode(&ep("zk-a"), EndpointMode::Stalled);
        let gateway = SessionGateway::new(Arc::new(service.clone()), settings("app"));

        let err = gateway.connect(&ep("zk-a")).await.unwrap_err();
        assert!(matches!(err, KeeperError::ConnectTimeout { .. }));
        assert_eq!(gateway.state(), SessionState::Disconnected);
        assert_eq!(service.session_count(), 0);
    }

    #[tokio::test]
    async fn test_watch_fires_through_dispatcher() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;
        gateway.ensure_root("/cfg", b"v1").await.unwrap();

        let (data, handle) = gateway.get_data_watched("/cfg").await.unwrap();
        assert_eq!(data, b"v1".to_vec());
        assert!(gateway.registry().contains("/cfg"));

        gateway.set_data("/cfg", b"v2").await.unwrap();
        assert_eq!(
            handle.wait().await,
            WatchOutcome::Fired(EventKind::NodeDataChanged)
        );
        assert!(!gateway.registry().contains("/cfg"));
    }

    #[tokio::test]
    async fn test_failed_arm_leaves_no_entry() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;

        let err = gateway.get_data_watched("/missing").await.unwrap_err();
        assert!(err.is_no_node());
        assert!(gateway.registry().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_drains_registry() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;

        let (_, handle) = gateway.get_data_watched("/locks").await.unwrap();
        gateway.disconnect().await;

        assert!(gateway.registry().is_empty());
        assert_eq!(handle.wait().await, WatchOutcome::Released);
        assert_eq!(gateway.state(), SessionState::Disconnected);
        assert_eq!(service.session_count(), 0);
    }

    #[tokio::test]
    async fn test_expiry_wakes_waiters() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;
        let (_, handle) = gateway.get_data_watched("/locks").await.unwrap();

        let session = gateway.session_id().await.unwrap();
        service.expire_session(session);

        assert_eq!(handle.wait().await, WatchOutcome::SessionExpired);
        assert_eq!(gateway.state(), SessionState::Expired);
        let err = gateway.exists("/locks").await.unwrap_err();
        assert!(matches!(err, KeeperError::SessionExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retry_then_fail() {
        let service = MemoryService::new();
        let gateway = connected(&service, "app").await;
        service.set_endpoint_mode(&ep("zk-a"), EndpointMode::Down);

        let started = Instant::now();
        let err = gateway.exists("/locks").await.unwrap_err();
        assert!(err.is_transient());
        // two retries: 10ms + 20ms
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
