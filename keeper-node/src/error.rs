use thiserror::Error;

/// Why a single node operation was rejected by the coordination service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpFailure {
    #[error("node already exists")]
    NodeExists,

    #[error("node does not exist")]
    NoNode,

    #[error("node has children")]
    NotEmpty,

    #[error("version mismatch")]
    BadVersion,

    #[error("ephemeral nodes cannot have children")]
    NoChildrenForEphemerals,

    #[error("{0}")]
    Other(String),
}

/// Errors that can occur in the keeper client library
#[derive(Error, Debug)]
pub enum KeeperError {
    /// Malformed or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session handshake did not complete within the connect timeout
    #[error("Connect to {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    /// One full pass over the endpoint list produced no session
    #[error("All {attempted} endpoints unreachable")]
    AllEndpointsUnreachable { attempted: usize },

    /// The service invalidated the session; its ephemeral nodes are gone
    #[error("Session expired")]
    SessionExpired,

    /// No live session is bound to the gateway
    #[error("Not connected to any endpoint")]
    NotConnected,

    /// Release of a lock node this client does not hold
    #[error("Lock node not held: {0}")]
    NotHeld(String),

    /// Runtime endpoint migration requested while disabled
    #[error("Runtime failover is disabled")]
    FailoverDisabled,

    /// A single node operation failed
    #[error("{op} {path} failed: {reason}")]
    OperationFailed {
        op: &'static str,
        path: String,
        reason: OpFailure,
    },

    /// Connection-level failure talking to the service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias using KeeperError
pub type Result<T> = std::result::Result<T, KeeperError>;

impl KeeperError {
    pub fn op(op: &'static str, path: impl Into<String>, reason: OpFailure) -> Self {
        KeeperError::OperationFailed {
            op,
            path: path.into(),
            reason,
        }
    }

    /// The operation failure reason, if this is an operation error
    pub fn op_failure(&self) -> Option<&OpFailure> {
        match self {
            KeeperError::OperationFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_no_node(&self) -> bool {
        matches!(self.op_failure(), Some(OpFailure::NoNode))
    }

    pub fn is_node_exists(&self) -> bool {
        matches!(self.op_failure(), Some(OpFailure::NodeExists))
    }

    /// Connection-loss style failures that a retry on the same session may fix
    pub fn is_transient(&self) -> bool {
        matches!(self, KeeperError::Transport(_) | KeeperError::Io(_))
    }
}

impl From<String> for KeeperError {
    fn from(s: String) -> Self {
        KeeperError::Other(s)
    }
}

impl From<&str> for KeeperError {
    fn from(s: &str) -> Self {
        KeeperError::Other(s.to_string())
    }
}

impl From<config::ConfigError> for KeeperError {
    fn from(err: config::ConfigError) -> Self {
        KeeperError::Config(err.to_string())
    }
}
