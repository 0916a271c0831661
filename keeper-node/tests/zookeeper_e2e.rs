//! End-to-End tests against a real ZooKeeper server
//!
//! Prerequisites:
//! - ZooKeeper listening on 127.0.0.1:2181, or set KEEPER_E2E_SERVERS
//!
//! Usage:
//!   cargo test --test zookeeper_e2e -- --ignored

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use keeper_node::{
    DistributedLock, FailoverController, GatewaySettings, KeeperConfig, SessionGateway,
    ZkTransport,
};

fn e2e_config(namespace: &str) -> KeeperConfig {
    let mut config = KeeperConfig::default();
    if let Ok(servers) = std::env::var("KEEPER_E2E_SERVERS") {
        config.zookeeper.servers = vec![servers];
    }
    config.zookeeper.namespace = namespace.to_string();
    config
}

async fn connect(config: &KeeperConfig) -> Result<Arc<FailoverController>> {
    let gateway = Arc::new(SessionGateway::new(
        Arc::new(ZkTransport::new()),
        GatewaySettings::from_config(config),
    ));
    let controller = Arc::new(FailoverController::from_config(&config.zookeeper, gateway)?);
    timeout(Duration::from_secs(10), controller.connect_until_ready()).await??;
    Ok(controller)
}

#[tokio::test]
#[ignore]
async fn test_e2e_lock_handoff() -> Result<()> {
    let config = e2e_config(&format!("keeper-e2e-{}", uuid::Uuid::new_v4()));
    let first = connect(&config).await?;
    let second = connect(&config).await?;

    let a = DistributedLock::new(Arc::clone(first.gateway()), &config.lock.root);
    let b = Arc::new(DistributedLock::new(
        Arc::clone(second.gateway()),
        &config.lock.root,
    ));

    let held = a.acquire().await?;
    let waiter = {
        let b = Arc::clone(&b);
        tokio::spawn(async move { b.acquire().await })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!waiter.is_finished(), "second client acquired a held lock");

    a.release(&held).await?;
    let node = timeout(Duration::from_secs(10), waiter).await???;
    assert!(b.is_held(&node));
    b.release(&node).await?;

    first.shutdown().await;
    second.shutdown().await;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_e2e_namespace_and_root_created() -> Result<()> {
    let config = e2e_config(&format!("keeper-e2e-{}", uuid::Uuid::new_v4()));
    let controller = connect(&config).await?;
    let gateway = controller.gateway();

    assert!(gateway.exists(&config.lock.root).await?);
    assert_eq!(
        gateway.get_data(&config.lock.root).await?,
        config.lock.root_data.as_bytes().to_vec()
    );

    controller.shutdown().await;
    Ok(())
}
