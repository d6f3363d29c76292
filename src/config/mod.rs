//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `TRELLIS_*` environment
//! variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `TRELLIS_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host HTTP port. Default: `8080`.
    pub port: u16,

    /// IP address the host binds to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Base URL a remote dispatcher targets. Default: `http://localhost:8080`.
    pub remote_url: String,

    /// Distributed cache service URL, when one is deployed.
    pub cache_url: Option<String>,

    /// Max entries in the in-memory cache tier. Default: `10_000`.
    pub local_capacity: u64,

    /// Outbound HTTP timeout in milliseconds. Default: `5_000`.
    pub http_timeout_ms: u64,
}

/// Default remote dispatch URL used when `TRELLIS_REMOTE_URL` is not set.
pub const DEFAULT_REMOTE_URL: &str = "http://localhost:8080";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            cache_url: None,
            local_capacity: 10_000,
            http_timeout_ms: 5_000,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "TRELLIS_PORT";
    const ENV_BIND_ADDR: &'static str = "TRELLIS_BIND_ADDR";
    const ENV_REMOTE_URL: &'static str = "TRELLIS_REMOTE_URL";
    const ENV_CACHE_URL: &'static str = "TRELLIS_CACHE_URL";
    const ENV_LOCAL_CAPACITY: &'static str = "TRELLIS_LOCAL_CAPACITY";
    const ENV_HTTP_TIMEOUT_MS: &'static str = "TRELLIS_HTTP_TIMEOUT_MS";

    /// Loads configuration from environment variables (falling back to
    /// defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let remote_url = Self::parse_string_from_env(Self::ENV_REMOTE_URL, defaults.remote_url);
        let cache_url = Self::parse_optional_string_from_env(Self::ENV_CACHE_URL);
        let local_capacity =
            Self::parse_u64_from_env(Self::ENV_LOCAL_CAPACITY, defaults.local_capacity);
        let http_timeout_ms =
            Self::parse_u64_from_env(Self::ENV_HTTP_TIMEOUT_MS, defaults.http_timeout_ms);

        Ok(Self {
            port,
            bind_addr,
            remote_url,
            cache_url,
            local_capacity,
            http_timeout_ms,
        })
    }

    /// Validates basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::check_url("remote_url", &self.remote_url)?;

        if let Some(ref url) = self.cache_url {
            Self::check_url("cache_url", url)?;
        }

        if self.local_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                name: "local_capacity",
            });
        }

        if self.http_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                name: "http_timeout_ms",
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Outbound HTTP timeout as a [`Duration`].
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() || !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                name,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
