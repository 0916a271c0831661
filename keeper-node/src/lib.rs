//! Keeper Node Library
//!
//! Client side of a ZooKeeper-style coordination service: a session gateway
//! with endpoint failover, a registry of one-shot watches, and a distributed
//! lock built on sequential ephemeral nodes.

pub mod config;
pub mod error;
pub mod failover;
pub mod gateway;
pub mod lock;
pub mod memory;
pub mod store;
pub mod transport;
pub mod watch;
pub mod zookeeper;

// Re-export commonly used types
pub use config::{KeeperConfig, LockConfig, ZookeeperConfig};
pub use error::{KeeperError, OpFailure, Result};
pub use failover::{FailoverController, FailoverPolicy, FailoverState};
pub use gateway::{GatewaySettings, SessionGateway};
pub use lock::{DistributedLock, LockNode, LockStats};
pub use memory::{EndpointMode, MemoryService};
pub use store::NodeStore;
pub use transport::{SessionEvent, SessionState, Transport};
pub use watch::{WatchHandle, WatchOutcome, WatchRegistry};
pub use zookeeper::ZkTransport;

pub use keeper_common::{CreateMode, Endpoint, EventKind, WatchKind};
