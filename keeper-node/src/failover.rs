//! Endpoint selection and failover.
//!
//! Connection establishment is an explicit state machine advanced one
//! candidate at a time by [`FailoverController::step`]. A failed pass over
//! every endpoint is followed by a fixed backoff and another pass; the loop
//! never gives up on its own.

use keeper_common::Endpoint;
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ZookeeperConfig;
use crate::error::{KeeperError, Result};
use crate::gateway::SessionGateway;
use crate::transport::SessionState;

/// Where the controller is in establishing a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverState {
    /// Nothing attempted yet, or shut down
    Idle,
    /// Next step tries the endpoint at `index`; `tried` candidates already failed this pass
    Probing { index: usize, tried: usize },
    /// Session live on the endpoint at `index`
    Connected { index: usize },
    /// A whole pass failed; the next step starts a new one
    AllEndpointsFailed,
}

/// Failover tuning taken from configuration
#[derive(Debug, Clone)]
pub struct FailoverPolicy {
    pub auto_failover: bool,
    pub probe_timeout: Duration,
    pub retry_backoff: Duration,
}

impl FailoverPolicy {
    pub fn from_config(config: &ZookeeperConfig) -> Self {
        Self {
            auto_failover: config.auto_failover,
            probe_timeout: config.probe_timeout(),
            retry_backoff: config.retry_backoff(),
        }
    }
}

struct Machine {
    state: FailoverState,
    /// Index each pass starts from: the last endpoint that worked, else the configured one
    start: usize,
}

/// Picks a reachable endpoint and keeps the gateway connected to one
pub struct FailoverController {
    gateway: Arc<SessionGateway>,
    endpoints: Vec<Endpoint>,
    policy: FailoverPolicy,
    machine: Mutex<Machine>,
    passes_failed: AtomicU64,
    shutdown: AtomicBool,
}

impl FailoverController {
    /// Build from configuration; the endpoint list must not be empty
    pub fn from_config(config: &ZookeeperConfig, gateway: Arc<SessionGateway>) -> Result<Self> {
        let endpoints = config.endpoints()?;
        let start = config.start_index(endpoints.len());
        Self::new(gateway, endpoints, start, FailoverPolicy::from_config(config))
    }

    pub fn new(
        gateway: Arc<SessionGateway>,
        endpoints: Vec<Endpoint>,
        start: usize,
        policy: FailoverPolicy,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(KeeperError::Config("no endpoints configured".to_string()));
        }
        let start = if start < endpoints.len() {
            start
        } else {
            let clamped = endpoints.len() - 1;
            warn!(
                configured = start,
                used = clamped,
                "Initial endpoint index out of range"
            );
            clamped
        };

        Ok(Self {
            gateway,
            endpoints,
            policy,
            machine: Mutex::new(Machine {
                state: FailoverState::Idle,
                start,
            }),
            passes_failed: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn gateway(&self) -> &Arc<SessionGateway> {
        &self.gateway
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub async fn state(&self) -> FailoverState {
        self.machine.lock().await.state
    }

    /// Number of complete passes in which no endpoint produced a session
    pub fn passes_failed(&self) -> u64 {
        self.passes_failed.load(Ordering::Relaxed)
    }

    /// Endpoint the gateway is connected through, if any
    pub async fn current(&self) -> Option<&Endpoint> {
        match self.machine.lock().await.state {
            FailoverState::Connected { index } => self.endpoints.get(index),
            _ => None,
        }
    }

    /// Advance the state machine by one candidate
    ///
    /// Never sleeps; the backoff between passes belongs to the caller.
    pub async fn step(&self) -> FailoverState {
        let mut machine = self.machine.lock().await;
        let next = match machine.state {
            FailoverState::Idle | FailoverState::AllEndpointsFailed => FailoverState::Probing {
                index: machine.start,
                tried: 0,
            },
            FailoverState::Connected { index } => FailoverState::Connected { index },
            FailoverState::Probing { index, tried } => {
                let endpoint = &self.endpoints[index];
                if self.try_endpoint(endpoint).await {
                    machine.start = index;
                    gauge!("keeper_active_endpoint", index as f64);
                    FailoverState::Connected { index }
                } else if tried + 1 >= self.endpoints.len() {
                    let passes = self.passes_failed.fetch_add(1, Ordering::Relaxed) + 1;
                    counter!("keeper_failover_passes_failed", 1);
                    let err = KeeperError::AllEndpointsUnreachable {
                        attempted: self.endpoints.len(),
                    };
                    error!(passes, error = %err, "Endpoint pass failed");
                    FailoverState::AllEndpointsFailed
                } else {
                    FailoverState::Probing {
                        index: (index + 1) % self.endpoints.len(),
                        tried: tried + 1,
                    }
                }
            }
        };
        machine.state = next;
        next
    }

    async fn try_endpoint(&self, endpoint: &Endpoint) -> bool {
        if !self
            .gateway
            .transport()
            .probe(endpoint, self.policy.probe_timeout)
            .await
        {
            counter!("keeper_probe_failures", 1);
            warn!(endpoint = %endpoint, "Endpoint unreachable");
            return false;
        }

        match self.gateway.connect(endpoint).await {
            Ok(()) => {
                info!(endpoint = %endpoint, "Connected");
                true
            }
            Err(e) => {
                error!(endpoint = %endpoint, error = %e, "Connect failed");
                false
            }
        }
    }

    /// Step until a session is live, backing off after each failed pass
    ///
    /// Returns only on success or after [`shutdown`](Self::shutdown).
    pub async fn connect_until_ready(&self) -> Result<Endpoint> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(KeeperError::NotConnected);
            }
            match self.step().await {
                FailoverState::Connected { index } => return Ok(self.endpoints[index].clone()),
                FailoverState::AllEndpointsFailed => {
                    info!(
                        backoff_ms = self.policy.retry_backoff.as_millis() as u64,
                        "Retrying endpoints after backoff"
                    );
                    tokio::time::sleep(self.policy.retry_backoff).await;
                }
                FailoverState::Idle | FailoverState::Probing { .. } => {}
            }
        }
    }

    /// Move the session to another reachable endpoint
    ///
    /// Only allowed with automatic failover enabled. The current endpoint is
    /// never chosen; the watch registry is drained before the old session is
    /// torn down.
    pub async fn failover(&self) -> Result<Endpoint> {
        if !self.policy.auto_failover {
            return Err(KeeperError::FailoverDisabled);
        }

        let mut machine = self.machine.lock().await;
        let current = match machine.state {
            FailoverState::Connected { index } => index,
            _ => machine.start,
        };
        counter!("keeper_failovers", 1);
        warn!(from = %self.endpoints[current], "Failing over");

        for offset in 1..self.endpoints.len() {
            let index = (current + offset) % self.endpoints.len();
            if self.try_endpoint(&self.endpoints[index]).await {
                machine.start = index;
                machine.state = FailoverState::Connected { index };
                gauge!("keeper_active_endpoint", index as f64);
                return Ok(self.endpoints[index].clone());
            }
        }

        // a failed connect attempt has already torn the old session down
        if self.gateway.endpoint().await.as_ref() != Some(&self.endpoints[current]) {
            machine.state = FailoverState::AllEndpointsFailed;
        }
        Err(KeeperError::AllEndpointsUnreachable {
            attempted: self.endpoints.len().saturating_sub(1),
        })
    }

    /// Switch to a specific endpoint at runtime
    ///
    /// Refused without automatic failover while a session is live; a no-op
    /// when already connected through it.
    pub async fn switch_to(&self, endpoint: &Endpoint) -> Result<()> {
        let index = self
            .endpoints
            .iter()
            .position(|e| e == endpoint)
            .ok_or_else(|| KeeperError::Config(format!("unknown endpoint {}", endpoint)))?;

        let mut machine = self.machine.lock().await;
        if machine.state == (FailoverState::Connected { index }) {
            debug!(endpoint = %endpoint, "Already connected to endpoint");
            return Ok(());
        }
        if matches!(machine.state, FailoverState::Connected { .. }) && !self.policy.auto_failover {
            return Err(KeeperError::FailoverDisabled);
        }
        if !self
            .gateway
            .transport()
            .probe(endpoint, self.policy.probe_timeout)
            .await
        {
            return Err(KeeperError::AllEndpointsUnreachable { attempted: 1 });
        }

        self.gateway.connect(endpoint).await?;
        machine.start = index;
        machine.state = FailoverState::Connected { index };
        Ok(())
    }

    /// Watch the session and re-establish it when it is lost
    ///
    /// Expiry always triggers reconnection. A plain disconnect triggers
    /// failover only when enabled; otherwise the session is left to recover.
    pub fn spawn_supervisor(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut state_rx = self.gateway.subscribe_state();

        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                if controller.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                state_rx.borrow_and_update();
                let connected = matches!(controller.state().await, FailoverState::Connected { .. });
                if !connected {
                    continue;
                }

                // re-read: a failover may have finished while we waited
                match controller.gateway.state() {
                    SessionState::Expired => {
                        warn!("Session expired, re-establishing");
                        controller.recover().await;
                    }
                    SessionState::Disconnected if controller.policy.auto_failover => {
                        warn!("Session lost, failing over");
                        controller.recover().await;
                    }
                    SessionState::Disconnected => {
                        debug!("Session disconnected, waiting for it to recover");
                    }
                    SessionState::Connecting | SessionState::Connected => {}
                }
            }
            debug!("Failover supervisor stopped");
        })
    }

    async fn recover(&self) {
        if self.policy.auto_failover {
            match self.failover().await {
                Ok(endpoint) => {
                    info!(endpoint = %endpoint, "Failover complete");
                    return;
                }
                Err(e) => warn!(error = %e, "Failover found no other endpoint"),
            }
        }

        self.machine.lock().await.state = FailoverState::AllEndpointsFailed;
        match self.connect_until_ready().await {
            Ok(endpoint) => info!(endpoint = %endpoint, "Session re-established"),
            Err(e) => debug!(error = %e, "Recovery abandoned"),
        }
    }

    /// Stop supervising and close the session, releasing every watch
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.gateway.disconnect().await;
        self.machine.lock().await.state = FailoverState::Idle;
        info!("Failover controller shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewaySettings;
    use crate::memory::{EndpointMode, MemoryService};

    fn endpoints(n: usize) -> Vec<Endpoint> {
        (0..n).map(|i| Endpoint::new(format!("zk-{}", i), 2181)).collect()
    }

    fn policy(auto_failover: bool) -> FailoverPolicy {
        FailoverPolicy {
            auto_failover,
            probe_timeout: Duration::from_millis(500),
            retry_backoff: Duration::from_secs(15),
        }
    }

    fn controller(service: &MemoryService, n: usize, start: usize, auto: bool) -> FailoverController {
        let settings = GatewaySettings {
            namespace: "ns".to_string(),
            session_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(100),
            max_retries: 0,
            base_sleep: Duration::from_millis(10),
            root: None,
        };
        let gateway = Arc::new(SessionGateway::new(Arc::new(service.clone()), settings));
        FailoverController::new(gateway, endpoints(n), start, policy(auto)).unwrap()
    }

    #[tokio::test]
    async fn test_empty_endpoint_list_rejected() {
        let gateway = Arc::new(SessionGateway::new(
            Arc::new(MemoryService::new()),
            GatewaySettings::default(),
        ));
        assert!(FailoverController::new(gateway, Vec::new(), 0, policy(false)).is_err());
    }

    #[tokio::test]
    async fn test_steps_are_explicit() {
        let service = MemoryService::new();
        let eps = endpoints(2);
        service.set_endpoint_mode(&eps[0], EndpointMode::Down);
        let ctl = controller(&service, 2, 0, false);

        assert_eq!(ctl.state().await, FailoverState::Idle);
        assert_eq!(ctl.step().await, FailoverState::Probing { index: 0, tried: 0 });
        assert_eq!(ctl.step().await, FailoverState::Probing { index: 1, tried: 1 });
        assert_eq!(ctl.step().await, FailoverState::Connected { index: 1 });
        assert_eq!(ctl.current().await, Some(&eps[1]));
        assert_eq!(service.connect_attempts(&eps[0]), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_start_is_clamped() {
        let service = MemoryService::new();
        let ctl = controller(&service, 2, 7, false);
        assert_eq!(ctl.step().await, FailoverState::Probing { index: 1, tried: 0 });
    }

    #[tokio::test]
    async fn test_full_pass_failure_counts() {
        let service = MemoryService::new();
        let eps = endpoints(3);
        for ep in &eps {
            service.set_endpoint_mode(ep, EndpointMode::Down);
        }
        let ctl = controller(&service, 3, 1, false);

        let mut last = ctl.step().await;
        while last != FailoverState::AllEndpointsFailed {
            last = ctl.step().await;
        }
        assert_eq!(ctl.passes_failed(), 1);
        for ep in &eps {
            assert_eq!(service.probe_count(ep), 1);
        }
        // next pass restarts at the configured index
        assert_eq!(ctl.step().await, FailoverState::Probing { index: 1, tried: 0 });
    }

    #[tokio::test]
    async fn test_failover_disabled() {
        let service = MemoryService::new();
        let ctl = controller(&service, 2, 0, false);
        ctl.connect_until_ready().await.unwrap();
        assert!(matches!(
            ctl.failover().await,
            Err(KeeperError::FailoverDisabled)
        ));
        assert!(matches!(
            ctl.switch_to(&endpoints(2)[1]).await,
            Err(KeeperError::FailoverDisabled)
        ));
    }

    #[tokio::test]
    async fn test_failover_skips_current_endpoint() {
        let service = MemoryService::new();
        let eps = endpoints(3);
        let ctl = controller(&service, 3, 0, true);
        assert_eq!(ctl.connect_until_ready().await.unwrap(), eps[0]);

        service.set_endpoint_mode(&eps[1], EndpointMode::Down);
        assert_eq!(ctl.failover().await.unwrap(), eps[2]);
        assert_eq!(service.connect_attempts(&eps[0]), 1);
        assert!(service.sessions_on(&eps[0]).is_empty());
    }

    #[tokio::test]
    async fn test_switch_to_current_is_noop() {
        let service = MemoryService::new();
        let eps = endpoints(2);
        let ctl = controller(&service, 2, 0, false);
        ctl.connect_until_ready().await.unwrap();

        ctl.switch_to(&eps[0]).await.unwrap();
        assert_eq!(service.connect_attempts(&eps[0]), 1);
    }

    #[tokio::test]
    async fn test_shutdown_returns_to_idle() {
        let service = MemoryService::new();
        let ctl = controller(&service, 1, 0, false);
        ctl.connect_until_ready().await.unwrap();

        ctl.shutdown().await;
        assert_eq!(ctl.state().await, FailoverState::Idle);
        assert_eq!(ctl.gateway().state(), SessionState::Disconnected);
        assert!(ctl.connect_until_ready().await.is_err());
    }
}
