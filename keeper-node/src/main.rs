use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, gauge};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use keeper_node::{
    DistributedLock, FailoverController, GatewaySettings, KeeperConfig, KeeperError,
    SessionGateway, ZkTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("KEEPER_CONFIG").unwrap_or_else(|_| "config/default".into());

    // Load configuration from file if available, otherwise use defaults
    let (config, load_error) = match KeeperConfig::from_file(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (KeeperConfig::default(), Some(e)),
    };

    init_logging(&config);
    info!("Starting Keeper Node v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => info!(path = %config_path, "Configuration loaded"),
        Some(e) => warn!("Failed to load config file: {}, using defaults", e),
    }

    config.validate().context("Invalid configuration")?;

    if config.metrics.enabled {
        start_metrics(&config.metrics.listen_addr)?;
    }

    let gateway = Arc::new(SessionGateway::new(
        Arc::new(ZkTransport::new()),
        GatewaySettings::from_config(&config),
    ));
    let controller = Arc::new(
        FailoverController::from_config(&config.zookeeper, Arc::clone(&gateway))
            .context("Failed to build failover controller")?,
    );

    info!(
        endpoints = controller.endpoints().len(),
        namespace = %config.zookeeper.namespace,
        auto_failover = config.zookeeper.auto_failover,
        "Connecting to coordination service"
    );

    let endpoint = tokio::select! {
        result = controller.connect_until_ready() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted before a session was established");
            return Ok(());
        }
    };
    info!(endpoint = %endpoint, "Coordination session ready");

    let supervisor = controller.spawn_supervisor();
    let lock = Arc::new(DistributedLock::new(Arc::clone(&gateway), &config.lock.root));
    let hold = Duration::from_millis(config.lock.hold_ms);

    tokio::select! {
        _ = lock_worker(Arc::clone(&lock), hold) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    controller.shutdown().await;
    supervisor.abort();

    let stats = lock.stats();
    info!(
        acquired = stats.acquired,
        released = stats.released,
        waits = stats.waits,
        "Keeper Node stopped"
    );
    Ok(())
}

fn init_logging(config: &KeeperConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("keeper_node={},keeper_common={}", config.logging.level, config.logging.level)
            .into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if config.logging.format.as_deref() == Some("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn start_metrics(listen_addr: &str) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("Invalid metrics listen address {}", listen_addr))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    describe_counter!("keeper_connect_attempts", "Session connect attempts");
    describe_counter!("keeper_sessions_established", "Sessions that reached Connected");
    describe_counter!("keeper_sessions_expired", "Sessions expired by the service");
    describe_counter!("keeper_failover_passes_failed", "Endpoint passes with no session");
    describe_counter!("keeper_lock_acquired", "Locks acquired");
    describe_counter!("keeper_lock_released", "Locks released");
    describe_counter!("keeper_lock_waits", "Predecessor waits while acquiring");
    describe_counter!("keeper_watch_fired", "Watch notifications delivered");
    describe_counter!("keeper_watch_discarded", "Notifications with no registered watch");
    describe_gauge!("keeper_watches_armed", "Watches currently registered");
    describe_gauge!("keeper_locks_held", "Locks currently held by this process");
    describe_gauge!("keeper_lock_stale_nodes", "Failed contender nodes awaiting deletion");
    gauge!("keeper_locks_held", 0.0);

    info!(metrics_addr = %addr, "Prometheus metrics server started");
    Ok(())
}

/// Take the lock, hold it, let it go, forever
async fn lock_worker(lock: Arc<DistributedLock>, hold: Duration) {
    loop {
        let node = match lock.acquire().await {
            Ok(node) => node,
            Err(KeeperError::SessionExpired) | Err(KeeperError::NotConnected) => {
                warn!("Session unavailable, retrying lock shortly");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
            Err(e) => {
                error!(error = %e, "Lock acquisition failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        info!(node = %node.path(), hold_ms = hold.as_millis() as u64, "Holding lock");
        tokio::time::sleep(hold).await;

        if let Err(e) = lock.release(&node).await {
            warn!(node = %node.path(), error = %e, "Lock release failed");
        }
    }
}
