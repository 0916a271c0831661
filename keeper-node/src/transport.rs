//! Seam between the session gateway and a concrete coordination service.
//!
//! A [`Transport`] opens sessions against one endpoint. Each session hands
//! back its operations ([`SessionOps`]) and a single ordered notification
//! channel carrying connection-state changes and watch firings.

use async_trait::async_trait;
use keeper_common::{CreateMode, Endpoint, EventKind};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;

/// Lifecycle of a session as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Expired,
}

/// One notification from the service, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connection state change
    State(SessionState),
    /// An armed watch fired; `path` is the physical path
    Node { kind: EventKind, path: String },
}

/// A freshly opened session
pub struct Connection {
    pub ops: Arc<dyn SessionOps>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Opens sessions against coordination-service endpoints
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Cheap reachability check, bounded by `timeout`
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> bool;

    /// Open a session; completion is signalled on the event channel
    async fn connect(&self, endpoint: &Endpoint, session_timeout: Duration) -> Result<Connection>;
}

/// Node operations on one live session, on physical paths
///
/// Watch flags arm a one-shot watch whose firing is delivered on the
/// session's event channel.
#[async_trait]
pub trait SessionOps: Send + Sync {
    fn session_id(&self) -> i64;

    /// Create a node, returning the path actually assigned
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String>;

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<()>;

    async fn exists(&self, path: &str, watch: bool) -> Result<bool>;

    async fn get_children(&self, path: &str, watch: bool) -> Result<Vec<String>>;

    async fn get_data(&self, path: &str, watch: bool) -> Result<Vec<u8>>;

    async fn set_data(&self, path: &str, data: &[u8], version: Option<i32>) -> Result<()>;

    /// End the session; ephemeral nodes it owns are removed by the service
    async fn close(&self);
}

/// Socket-level probe: can a TCP connection to the endpoint be opened in time
pub async fn tcp_probe(endpoint: &Endpoint, timeout: Duration) -> bool {
    let endpoint = endpoint.clone();
    let result = tokio::task::spawn_blocking(move || probe_blocking(&endpoint, timeout)).await;
    matches!(result, Ok(true))
}

fn probe_blocking(endpoint: &Endpoint, timeout: Duration) -> bool {
    let addrs: Vec<SocketAddr> = match (endpoint.host(), endpoint.port()).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            debug!(endpoint = %endpoint, error = %e, "Endpoint did not resolve");
            return false;
        }
    };

    addrs.into_iter().any(|addr| {
        let socket = match Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        {
            Ok(socket) => socket,
            Err(e) => {
                debug!(addr = %addr, error = %e, "Failed to create probe socket");
                return false;
            }
        };

        match socket.connect_timeout(&SockAddr::from(addr), timeout) {
            Ok(()) => true,
            Err(e) => {
                debug!(addr = %addr, error = %e, "Probe connect failed");
                false
            }
        }
    })
}
