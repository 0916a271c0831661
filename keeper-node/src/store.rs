//! Shared key/value storage on top of the gateway.
//!
//! Entries live at `<category>/<id>`; each upsert stamps a fresh random
//! token, so watchers of an entry observe every write. Failures are logged
//! and reported as `false` rather than propagated.

use keeper_common::{path, CreateMode};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::gateway::SessionGateway;
use crate::watch::WatchHandle;

pub struct NodeStore {
    gateway: Arc<SessionGateway>,
}

impl NodeStore {
    pub fn new(gateway: Arc<SessionGateway>) -> Self {
        Self { gateway }
    }

    /// Create a persistent node with its missing parents
    ///
    /// Returns `false` if it already exists or creation failed.
    pub async fn create_path(&self, node: &str) -> bool {
        match self.gateway.exists(node).await {
            Ok(true) => {
                debug!(path = %node, "Node already exists");
                return false;
            }
            Ok(false) => {}
            Err(e) => {
                error!(path = %node, error = %e, "Existence check failed");
                return false;
            }
        }

        match self.create_with_parents(node, &[]).await {
            Ok(()) => true,
            Err(e) => {
                error!(path = %node, error = %e, "Failed to create node");
                false
            }
        }
    }

    async fn create_with_parents(&self, node: &str, data: &[u8]) -> Result<()> {
        if let Some(parent) = path::parent(node) {
            if parent != "/" {
                self.gateway.ensure_path(&parent).await?;
            }
        }
        match self.gateway.create(node, data, CreateMode::Persistent).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_node_exists() => self.gateway.set_data(node, data).await,
            Err(e) => Err(e),
        }
    }

    /// Write `data`, creating the node and its parents if needed
    pub async fn set_data_creating(&self, node: &str, data: &str) -> bool {
        let result = match self.gateway.exists(node).await {
            Ok(true) => self.gateway.set_data(node, data.as_bytes()).await,
            Ok(false) => self.create_with_parents(node, data.as_bytes()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(path = %node, error = %e, "Failed to write node");
                false
            }
        }
    }

    /// Read a node's data as UTF-8, lossily
    pub async fn get_data(&self, node: &str) -> Option<String> {
        match self.gateway.get_data(node).await {
            Ok(data) => Some(String::from_utf8_lossy(&data).into_owned()),
            Err(e) => {
                debug!(path = %node, error = %e, "Failed to read node");
                None
            }
        }
    }

    /// Delete a node and everything below it
    pub async fn delete_recursive(&self, node: &str) -> bool {
        match self.gateway.exists(node).await {
            Ok(true) => {}
            Ok(false) => {
                error!(path = %node, "Cannot delete missing node");
                return false;
            }
            Err(e) => {
                error!(path = %node, error = %e, "Existence check failed");
                return false;
            }
        }

        // depth-first listing, parents before children
        let mut order = Vec::new();
        let mut pending = vec![path::normalize(node)];
        while let Some(current) = pending.pop() {
            for child in self.children(&current).await {
                pending.push(path::join(&current, &child));
            }
            order.push(current);
        }

        for target in order.iter().rev() {
            match self.gateway.delete(target, None).await {
                Ok(()) => {}
                Err(e) if e.is_no_node() => {}
                Err(e) => {
                    error!(path = %target, error = %e, "Failed to delete node");
                    return false;
                }
            }
        }
        debug!(path = %node, removed = order.len(), "Deleted subtree");
        true
    }

    pub async fn exists(&self, node: &str) -> bool {
        match self.gateway.exists(node).await {
            Ok(found) => found,
            Err(e) => {
                error!(path = %node, error = %e, "Existence check failed");
                false
            }
        }
    }

    /// Child names, empty on any failure
    pub async fn children(&self, node: &str) -> Vec<String> {
        match self.gateway.get_children(node).await {
            Ok(children) => children,
            Err(e) => {
                debug!(path = %node, error = %e, "Failed to list children");
                Vec::new()
            }
        }
    }

    /// Register or refresh `id` under `category`
    pub async fn upsert(&self, id: &str, category: &str) -> bool {
        let token = Uuid::new_v4().to_string();
        let ok = self.set_data_creating(&path::join(category, id), &token).await;
        if ok {
            info!(id = %id, category = %category, "Entry upserted");
        }
        ok
    }

    pub async fn remove(&self, id: &str, category: &str) -> bool {
        let ok = self.delete_recursive(&path::join(category, id)).await;
        if ok {
            info!(id = %id, category = %category, "Entry removed");
        }
        ok
    }

    /// Upsert every id; `true` only if all succeeded
    pub async fn batch_upsert<S: AsRef<str>>(&self, ids: &[S], category: &str) -> bool {
        let mut all = true;
        for id in ids {
            all &= self.upsert(id.as_ref(), category).await;
        }
        all
    }

    /// Remove every id; `true` only if all succeeded
    pub async fn batch_remove<S: AsRef<str>>(&self, ids: &[S], category: &str) -> bool {
        let mut all = true;
        for id in ids {
            all &= self.remove(id.as_ref(), category).await;
        }
        all
    }

    /// Read a node and get notified of its next change
    pub async fn watch(&self, node: &str) -> Option<(String, WatchHandle)> {
        match self.gateway.get_data_watched(node).await {
            Ok((data, handle)) => Some((String::from_utf8_lossy(&data).into_owned(), handle)),
            Err(e) => {
                error!(path = %node, error = %e, "Failed to watch node");
                None
            }
        }
    }

    /// Stop watching a node; pending waiters see `Released`
    pub fn unwatch(&self, node: &str) {
        self.gateway.release_watch(node);
    }

    /// Paths currently watched through this gateway
    pub fn watched(&self) -> Vec<String> {
        self.gateway.registry().list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewaySettings;
    use crate::memory::MemoryService;
    use crate::watch::WatchOutcome;
    use keeper_common::{Endpoint, EventKind};
    use std::time::Duration;

    async fn store(service: &MemoryService) -> NodeStore {
        let settings = GatewaySettings {
            namespace: "store".to_string(),
            session_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(500),
            max_retries: 0,
            base_sleep: Duration::from_millis(10),
            root: None,
        };
        let gateway = Arc::new(SessionGateway::new(Arc::new(service.clone()), settings));
        gateway.connect(&Endpoint::new("mem", 2181)).await.unwrap();
        NodeStore::new(gateway)
    }

    #[tokio::test]
    async fn test_create_path() {
        let service = MemoryService::new();
        let store = store(&service).await;

        assert!(store.create_path("/gateway/route").await);
        assert!(!store.create_path("/gateway/route").await);
        assert!(service.node_exists("/store/gateway/route"));
    }

    #[tokio::test]
    async fn test_set_data_creates_and_overwrites() {
        let service = MemoryService::new();
        let store = store(&service).await;

        assert!(store.set_data_creating("/cfg/flag", "on").await);
        assert_eq!(store.get_data("/cfg/flag").await.as_deref(), Some("on"));
        assert!(store.set_data_creating("/cfg/flag", "off").await);
        assert_eq!(store.get_data("/cfg/flag").await.as_deref(), Some("off"));
    }

    #[tokio::test]
    async fn test_delete_recursive() {
        let service = MemoryService::new();
        let store = store(&service).await;
        assert!(store.create_path("/tree/a/b").await);
        assert!(store.create_path("/tree/c").await);

        assert!(store.delete_recursive("/tree").await);
        assert!(!store.exists("/tree").await);
        assert!(!store.delete_recursive("/tree").await);
    }

    #[tokio::test]
    async fn test_children_empty_on_missing() {
        let service = MemoryService::new();
        let store = store(&service).await;
        assert!(store.children("/nothing").await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_stamps_fresh_token() {
        let service = MemoryService::new();
        let store = store(&service).await;

        assert!(store.upsert("svc-1", "/routes").await);
        let first = store.get_data("/routes/svc-1").await.unwrap();
        assert!(Uuid::parse_str(&first).is_ok());

        assert!(store.upsert("svc-1", "/routes").await);
        let second = store.get_data("/routes/svc-1").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let service = MemoryService::new();
        let store = store(&service).await;

        assert!(store.batch_upsert(&["a", "b", "c"], "/routes").await);
        assert_eq!(store.children("/routes").await.len(), 3);

        assert!(store.batch_remove(&["a", "b"], "/routes").await);
        assert_eq!(store.children("/routes").await, vec!["c".to_string()]);
        assert!(!store.batch_remove(&["c", "missing"], "/routes").await);
    }

    #[tokio::test]
    async fn test_watch_sees_upsert() {
        let service = MemoryService::new();
        let store = store(&service).await;
        assert!(store.upsert("svc-1", "/routes").await);

        let (_, handle) = store.watch("/routes/svc-1").await.unwrap();
        assert_eq!(store.watched(), vec!["/routes/svc-1".to_string()]);

        assert!(store.upsert("svc-1", "/routes").await);
        assert_eq!(
            handle.wait().await,
            WatchOutcome::Fired(EventKind::NodeDataChanged)
        );
    }

    #[tokio::test]
    async fn test_unwatch_releases() {
        let service = MemoryService::new();
        let store = store(&service).await;
        assert!(store.create_path("/cfg").await);

        let (_, handle) = store.watch("/cfg").await.unwrap();
        store.unwatch("/cfg");
        assert!(store.watched().is_empty());
        assert_eq!(handle.wait().await, WatchOutcome::Released);
    }
}
