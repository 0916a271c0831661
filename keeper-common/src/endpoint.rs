use std::fmt;
use std::str::FromStr;

use crate::MIN_ENDPOINT_PORT;

/// One coordination-service node, identified by `host:port`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

/// Why an endpoint string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// No `host:port` separator, or more than one
    Format(String),
    /// Host part is blank
    EmptyHost(String),
    /// Port is not a number
    InvalidPort(String),
    /// Port is below `MIN_ENDPOINT_PORT`
    PortTooLow(u16),
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::Format(s) => write!(f, "expected host:port, got '{}'", s),
            EndpointError::EmptyHost(s) => write!(f, "empty host in '{}'", s),
            EndpointError::InvalidPort(s) => write!(f, "invalid port in '{}'", s),
            EndpointError::PortTooLow(p) => {
                write!(f, "port {} is below minimum {}", p, MIN_ENDPOINT_PORT)
            }
        }
    }
}

impl std::error::Error for EndpointError {}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse and validate a `host:port` string
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        let s = s.trim();
        let mut parts = s.split(':');
        let (host, port) = match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(port), None) => (host.trim(), port.trim()),
            _ => return Err(EndpointError::Format(s.to_string())),
        };

        if host.is_empty() {
            return Err(EndpointError::EmptyHost(s.to_string()));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| EndpointError::InvalidPort(s.to_string()))?;
        if port < MIN_ENDPOINT_PORT {
            return Err(EndpointError::PortTooLow(port));
        }

        Ok(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(s)
    }
}
