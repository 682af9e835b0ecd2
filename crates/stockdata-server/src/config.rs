//! Server configuration.

use std::net::{AddrParseError, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 7776;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Lifetime of a cached ticker handle.
    pub cache_ttl: Duration,
    /// Timeout applied to every upstream request.
    pub upstream_timeout: Duration,
    /// Interval of the background purge of expired handles, if enabled.
    pub cache_sweep: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            cache_sweep: None,
        }
    }
}

impl ServerConfig {
    /// Load settings from the process environment, after merging an optional
    /// `.env` file.
    ///
    /// Unset variables use their defaults. Unparseable values are logged and
    /// also fall back to the default.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = lookup("STOCKDATA_HOST")
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .unwrap_or(defaults.host);
        let port = parsed(&lookup, "STOCKDATA_PORT").unwrap_or(defaults.port);
        let cache_ttl = parsed(&lookup, "STOCKDATA_CACHE_TTL_SECS")
            .map_or(defaults.cache_ttl, Duration::from_secs);
        let upstream_timeout = parsed(&lookup, "STOCKDATA_UPSTREAM_TIMEOUT_SECS")
            .map_or(defaults.upstream_timeout, Duration::from_secs);
        let cache_sweep = parsed::<u64>(&lookup, "STOCKDATA_CACHE_SWEEP_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            host,
            port,
            cache_ttl,
            upstream_timeout,
            cache_sweep,
        }
    }

    /// Returns the socket address to bind.
    ///
    /// # Errors
    /// Returns [`AddrParseError`] if `host:port` is not a valid address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable setting, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:7776");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_sweep, None);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("STOCKDATA_HOST", "127.0.0.1"),
            ("STOCKDATA_PORT", "8080"),
            ("STOCKDATA_CACHE_TTL_SECS", "60"),
            ("STOCKDATA_UPSTREAM_TIMEOUT_SECS", "5"),
            ("STOCKDATA_CACHE_SWEEP_SECS", "120"),
        ]);

        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.cache_sweep, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("STOCKDATA_PORT", "not-a-port"),
            ("STOCKDATA_CACHE_TTL_SECS", "-1"),
            ("STOCKDATA_CACHE_SWEEP_SECS", "0"),
            ("STOCKDATA_HOST", "  "),
        ]);

        assert_eq!(config, ServerConfig::default());
    }
}
