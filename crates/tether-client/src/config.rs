//! Client configuration loaded from environment variables.
//!
//! Everything defaults to the protocol's stock values so the companion
//! runs with zero configuration.

use std::time::Duration;

use tether_shared::constants::{DEFAULT_PORT, DISCOVERY_INTERVAL_SECS};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Port for UDP discovery and the TLS transport.
    /// Env: `TETHER_PORT`
    /// Default: `8877`
    pub port: u16,

    /// Seconds between discovery broadcast ticks.
    /// Env: `TETHER_DISCOVERY_INTERVAL_SECS`
    /// Default: `5`
    pub discovery_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            discovery_interval: Duration::from_secs(DISCOVERY_INTERVAL_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("TETHER_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) => config.port = parsed,
                Err(_) => {
                    tracing::warn!(value = %port, "Invalid TETHER_PORT, using default");
                }
            }
        }

        if let Ok(secs) = std::env::var("TETHER_DISCOVERY_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(parsed) if parsed > 0 => {
                    config.discovery_interval = Duration::from_secs(parsed);
                }
                _ => {
                    tracing::warn!(
                        value = %secs,
                        "Invalid TETHER_DISCOVERY_INTERVAL_SECS, using default"
                    );
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 8877);
        assert_eq!(config.discovery_interval, Duration::from_secs(5));
    }
}
