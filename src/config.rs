//! Configuration types for iterdns.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
#[cfg(feature = "prometheus")]
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolver configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Receive timeout in seconds, applied to every UDP exchange.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether answers and delegation glue are cached between queries.
    #[serde(default)]
    pub caching: bool,

    /// Fallback TTL in seconds for cached records whose own TTL is zero.
    #[serde(default)]
    pub cache_ttl: u64,

    /// Path of the persisted cache file.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Root server every resolution starts from when nothing better is
    /// known. Defaults to h.root-servers.net.
    #[serde(default = "default_root_server")]
    pub root_server: Ipv4Addr,

    /// UDP port upstream servers are queried on.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            caching: false,
            cache_ttl: 0,
            cache_path: default_cache_path(),
            root_server: default_root_server(),
            server_port: default_server_port(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "iterdns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[cfg(feature = "prometheus")]
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            #[cfg(feature = "prometheus")]
            prometheus_addr: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("dns-cache.json")
}

fn default_root_server() -> Ipv4Addr {
    // h.root-servers.net
    Ipv4Addr::new(198, 97, 190, 53)
}

fn default_server_port() -> u16 {
    53
}

fn default_log_level() -> String {
    "info".to_string()
}
