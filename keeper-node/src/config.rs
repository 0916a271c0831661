use keeper_common::path;
use keeper_common::Endpoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{KeeperError, Result};

/// Main configuration for a keeper client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    /// Coordination-service connection settings
    pub zookeeper: ZookeeperConfig,
    /// Distributed lock settings
    pub lock: LockConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Metrics exporter configuration
    pub metrics: MetricsConfig,
}

/// Coordination-service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZookeeperConfig {
    /// Enable the client
    pub enabled: bool,
    /// Endpoint list as `host:port` entries, tried in order
    pub servers: Vec<String>,
    /// Path prefix prepended to every logical path
    pub namespace: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: u64,
    /// Session handshake timeout in milliseconds
    pub connection_timeout_ms: u64,
    /// Maximum retries of an operation after a connection-level failure
    pub max_retries: u32,
    /// Initial operation retry sleep in milliseconds, doubled per retry
    pub base_sleep_time_ms: u64,
    /// Migrate to another endpoint when the live session is lost
    pub auto_failover: bool,
    /// Index into `servers` where the first pass starts
    pub initial_endpoint: usize,
    /// Socket-level reachability probe timeout in milliseconds
    pub probe_timeout_ms: u64,
    /// Sleep between two full failed passes in milliseconds
    pub retry_backoff_ms: u64,
}

/// Distributed lock settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Parent of all lock nodes
    pub root: String,
    /// Content written to the root when it is first created
    pub root_data: String,
    /// How long the worker holds the lock per cycle, in milliseconds
    pub hold_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, text)
    pub format: Option<String>,
}

/// Metrics exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    pub enabled: bool,
    /// Exporter listen address
    pub listen_addr: String,
}

impl Default for ZookeeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            servers: vec!["127.0.0.1:2181".to_string()],
            namespace: "com.start.default".to_string(),
            session_timeout_ms: 60_000,
            connection_timeout_ms: 2_000,
            max_retries: 3,
            base_sleep_time_ms: 1_000,
            auto_failover: false,
            initial_endpoint: 0,
            probe_timeout_ms: 500,
            retry_backoff_ms: 15_000,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            root: "/locks".to_string(),
            root_data: "locks".to_string(),
            hold_ms: 1_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Some("text".to_string()),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9898".to_string(),
        }
    }
}

impl ZookeeperConfig {
    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Get probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Get the sleep between failed passes as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Get the base operation retry sleep as Duration
    pub fn base_sleep(&self) -> Duration {
        Duration::from_millis(self.base_sleep_time_ms)
    }

    /// Parse the endpoint list
    ///
    /// Malformed entries are logged and skipped, duplicates are dropped.
    /// An empty result is a configuration error.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>> {
        let mut endpoints: Vec<Endpoint> = Vec::new();

        for entry in self
            .servers
            .iter()
            .flat_map(|s| s.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            match Endpoint::parse(entry) {
                Ok(endpoint) if endpoints.contains(&endpoint) => {
                    info!(endpoint = %endpoint, "Skipping duplicate endpoint");
                }
                Ok(endpoint) => {
                    info!(endpoint = %endpoint, "Added coordination endpoint");
                    endpoints.push(endpoint);
                }
                Err(e) => {
                    warn!(entry = %entry, error = %e, "Ignoring malformed endpoint");
                }
            }
        }

        if endpoints.is_empty() {
            return Err(KeeperError::Config(
                "no usable endpoint in zookeeper.servers".to_string(),
            ));
        }

        Ok(endpoints)
    }

    /// Starting index for the first pass, clamped into the endpoint list
    pub fn start_index(&self, endpoint_count: usize) -> usize {
        if endpoint_count == 0 {
            return 0;
        }
        if self.initial_endpoint >= endpoint_count {
            let clamped = endpoint_count - 1;
            warn!(
                configured = self.initial_endpoint,
                used = clamped,
                "Initial endpoint index out of range"
            );
            clamped
        } else {
            self.initial_endpoint
        }
    }
}

impl KeeperConfig {
    /// Load configuration from file, with `KEEPER__SECTION__FIELD` overrides
    pub fn from_file(path: &str) -> std::result::Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("KEEPER")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("zookeeper.servers")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let zk = &self.zookeeper;

        if !zk.enabled {
            return Err(KeeperError::Config("client is disabled".to_string()));
        }

        zk.endpoints()?;

        if zk.namespace.trim_matches('/').trim().is_empty() {
            return Err(KeeperError::Config("namespace cannot be blank".to_string()));
        }

        if zk.session_timeout_ms == 0 || zk.connection_timeout_ms == 0 {
            return Err(KeeperError::Config(
                "session and connection timeouts must be positive".to_string(),
            ));
        }

        if zk.probe_timeout_ms == 0 {
            return Err(KeeperError::Config(
                "probe timeout must be positive".to_string(),
            ));
        }

        if !self.lock.root.starts_with('/') || path::normalize(&self.lock.root) == "/" {
            return Err(KeeperError::Config(format!(
                "lock root must be an absolute non-root path, got '{}'",
                self.lock.root
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = KeeperConfig::default();
        assert_eq!(config.zookeeper.session_timeout(), Duration::from_secs(60));
        assert_eq!(config.zookeeper.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.zookeeper.probe_timeout(), Duration::from_millis(500));
        assert_eq!(config.zookeeper.retry_backoff(), Duration::from_secs(15));
        assert_eq!(config.zookeeper.namespace, "com.start.default");
        assert!(!config.zookeeper.auto_failover);
        assert_eq!(config.lock.root, "/locks");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoints_skip_malformed_and_duplicates() {
        let mut zk = ZookeeperConfig::default();
        zk.servers = vec![
            "zk1:2181,zk2:2181".to_string(),
            "zk1:2181".to_string(),
            "nocolon".to_string(),
            "zk3:80".to_string(),
            "zk3:2183".to_string(),
        ];

        let endpoints = zk.endpoints().unwrap();
        let rendered: Vec<String> = endpoints.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec!["zk1:2181", "zk2:2181", "zk3:2183"]);
    }

    #[test]
    fn test_no_usable_endpoint_is_config_error() {
        let mut config = KeeperConfig::default();
        config.zookeeper.servers = vec!["broken".to_string()];
        assert!(matches!(config.validate(), Err(KeeperError::Config(_))));
    }

    #[test]
    fn test_start_index_is_clamped() {
        let mut zk = ZookeeperConfig::default();
        zk.initial_endpoint = 7;
        assert_eq!(zk.start_index(3), 2);
        zk.initial_endpoint = 1;
        assert_eq!(zk.start_index(3), 1);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = KeeperConfig::default();
        config.zookeeper.namespace = "/".to_string();
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.zookeeper.connection_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.lock.root = "locks".to_string();
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.zookeeper.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[zookeeper]
servers = ["10.0.0.1:2181", "10.0.0.2:2181"]
namespace = "gateway"
auto_failover = true

[lock]
root = "/gateway-locks"
"#
        )
        .unwrap();

        let config = KeeperConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.zookeeper.servers.len(), 2);
        assert_eq!(config.zookeeper.namespace, "gateway");
        assert!(config.zookeeper.auto_failover);
        assert_eq!(config.zookeeper.session_timeout_ms, 60_000);
        assert_eq!(config.lock.root, "/gateway-locks");
        assert_eq!(config.lock.root_data, "locks");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keeper.toml");
        let path = path.to_str().unwrap();

        let mut config = KeeperConfig::default();
        config.zookeeper.initial_endpoint = 1;
        config.save_to_file(path).unwrap();

        let loaded = KeeperConfig::from_file(path).unwrap();
        assert_eq!(loaded.zookeeper.initial_endpoint, 1);
    }
}
