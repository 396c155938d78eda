//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::ConfigError;

/// Separator between the listen and destination side of a mapping
const MAPPING_SEPARATOR: char = '=';

/// Separator between mappings in a mapping list
const LIST_SEPARATOR: char = ';';

/// Host used when an address omits it (`:8080`)
const UNSPECIFIED_HOST: &str = "0.0.0.0";

/// An immutable listen/destination address pair
///
/// Written as `listen=destination`, for example `:8080=127.0.0.1:80`.
/// Both sides are resolved once, when the mapping is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortMapping {
    /// Address the forwarder listens on
    pub listen: SocketAddr,
    /// Address every accepted connection is relayed to
    pub destination: SocketAddr,
}

impl PortMapping {
    /// Create a mapping from already resolved addresses
    pub fn new(listen: SocketAddr, destination: SocketAddr) -> Self {
        Self {
            listen,
            destination,
        }
    }

    /// Parse a `;`-separated list of mappings, skipping empty segments
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ConfigError> {
        list.split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for PortMapping {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(MAPPING_SEPARATOR);
        let (listen, destination) = match (parts.next(), parts.next(), parts.next()) {
            (Some(listen), Some(destination), None) => (listen, destination),
            _ => return Err(ConfigError::InvalidMapping(s.to_string())),
        };

        Ok(Self {
            listen: resolve_address(listen.trim())?,
            destination: resolve_address(destination.trim())?,
        })
    }
}

impl TryFrom<String> for PortMapping {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PortMapping> for String {
    fn from(mapping: PortMapping) -> Self {
        mapping.to_string()
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.listen, MAPPING_SEPARATOR, self.destination)
    }
}

/// Resolve a `host:port` string to a socket address
///
/// An empty host means all interfaces. Host names are looked up once and
/// the first result is used.
pub fn resolve_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("missing port".to_string()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| invalid(format!("invalid port '{}'", port)))?;

    let host = match host {
        "" => UNSPECIFIED_HOST,
        h => h.trim_start_matches('[').trim_end_matches(']'),
    };

    (host, port)
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses found".to_string()))
}

/// Signals ssc sends to the supervised process group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildSignal {
    /// SIGSTOP
    Stop,
    /// SIGCONT
    Continue,
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGKILL
    Kill,
}

impl ChildSignal {
    /// Raw signal number
    #[cfg(unix)]
    pub fn as_raw(self) -> libc::c_int {
        match self {
            ChildSignal::Stop => libc::SIGSTOP,
            ChildSignal::Continue => libc::SIGCONT,
            ChildSignal::Interrupt => libc::SIGINT,
            ChildSignal::Terminate => libc::SIGTERM,
            ChildSignal::Kill => libc::SIGKILL,
        }
    }
}

impl fmt::Display for ChildSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildSignal::Stop => write!(f, "SIGSTOP"),
            ChildSignal::Continue => write!(f, "SIGCONT"),
            ChildSignal::Interrupt => write!(f, "SIGINT"),
            ChildSignal::Terminate => write!(f, "SIGTERM"),
            ChildSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}
