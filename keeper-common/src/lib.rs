// Keeper Common - Shared types between the coordination client and its tests
// This crate has no dependencies so it can be reused by any transport.

pub mod endpoint;
pub mod path;
pub mod sequence;

pub use endpoint::{Endpoint, EndpointError};

/// Lowest port accepted for a coordination-service endpoint
/// Anything below is treated as a misconfigured entry
pub const MIN_ENDPOINT_PORT: u16 = 1000;

/// How a node is created on the coordination service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateMode {
    /// Survives the creating session
    Persistent,
    /// Removed when the creating session ends
    Ephemeral,
    /// Persistent, with a service-assigned sequence suffix
    PersistentSequential,
    /// Ephemeral, with a service-assigned sequence suffix
    EphemeralSequential,
}

impl CreateMode {
    pub const fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    pub const fn is_sequential(self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }
}

/// Kind of one-shot watch armed on a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchKind {
    /// Armed by a data read; fires on data change or deletion
    Data,
    /// Armed by an existence check; fires on creation, data change or deletion
    Exists,
    /// Armed by a children read; fires on child changes or deletion
    Children,
}

/// Event delivered by the coordination service for an armed watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
}

impl EventKind {
    /// Whether this event satisfies a watch of the given kind
    pub const fn satisfies(self, kind: WatchKind) -> bool {
        match (self, kind) {
            (EventKind::NodeDeleted, _) => true,
            (EventKind::NodeDataChanged, WatchKind::Data | WatchKind::Exists) => true,
            (EventKind::NodeCreated, WatchKind::Exists) => true,
            (EventKind::NodeChildrenChanged, WatchKind::Children) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mode_flags() {
        assert!(CreateMode::EphemeralSequential.is_ephemeral());
        assert!(CreateMode::EphemeralSequential.is_sequential());
        assert!(!CreateMode::Persistent.is_ephemeral());
        assert!(CreateMode::PersistentSequential.is_sequential());
        assert!(!CreateMode::Ephemeral.is_sequential());
    }

    #[test]
    fn test_deletion_satisfies_every_watch() {
        for kind in [WatchKind::Data, WatchKind::Exists, WatchKind::Children] {
            assert!(EventKind::NodeDeleted.satisfies(kind));
        }
    }

    #[test]
    fn test_child_change_only_satisfies_child_watch() {
        assert!(EventKind::NodeChildrenChanged.satisfies(WatchKind::Children));
        assert!(!EventKind::NodeChildrenChanged.satisfies(WatchKind::Data));
        assert!(!EventKind::NodeCreated.satisfies(WatchKind::Data));
        assert!(EventKind::NodeCreated.satisfies(WatchKind::Exists));
    }
}
