//! Process configuration loaded from the environment.
//!
//! All settings come from `GPM_*` environment variables with compiled
//! defaults, loaded once at startup and read-only afterwards:
//!
//! | Variable | Effect | Default |
//! |---|---|---|
//! | `GPM_PORT` | inbound listen port | `8081` |
//! | `GPM_MAX_TIMEOUT` | per-request budget in seconds | `10` |
//! | `GPM_CONCURRENT_TRIES` | outbound attempts per request | `3` |
//! | `GPM_PROXY_LIST` | path to the newline-delimited proxy file | `proxy.list` |
//! | `GPM_SERVER_API_KEY` | required inbound API key (empty ⇒ open) | empty |

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the gateway listens on. Defaults to `8081`.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Wall-clock budget per inbound request, in seconds. Defaults to `10`.
    #[serde(default = "default_max_timeout")]
    pub max_timeout: u64,

    /// Number of concurrent outbound attempts per request. Defaults to `3`.
    #[serde(default = "default_concurrent_tries")]
    pub concurrent_tries: usize,

    /// Path to the newline-delimited proxy list. Defaults to `proxy.list`.
    #[serde(default = "default_proxy_list")]
    pub proxy_list: String,

    /// Inbound API key. An empty value disables authentication.
    #[serde(default)]
    pub server_api_key: String,
}

fn default_port() -> u16 {
    8081
}

fn default_max_timeout() -> u64 {
    10
}

fn default_concurrent_tries() -> usize {
    3
}

fn default_proxy_list() -> String {
    "proxy.list".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_timeout: default_max_timeout(),
            concurrent_tries: default_concurrent_tries(),
            proxy_list: default_proxy_list(),
            server_api_key: String::new(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `GPM_*` environment variables with fallback
    /// to the compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an environment value cannot be parsed into
    /// the field's type (e.g. a non-numeric `GPM_PORT`).
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("port", i64::from(default_port()))?
            .set_default("max_timeout", default_max_timeout() as i64)?
            .set_default("concurrent_tries", default_concurrent_tries() as i64)?
            .set_default("proxy_list", default_proxy_list())?
            .set_default("server_api_key", "")?
            .add_source(Environment::with_prefix("GPM").try_parsing(true))
            .build()?;

        settings.try_deserialize()
    }

    /// Validates the configuration for correctness.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Listen port must be greater than 0".to_string());
        }

        if self.max_timeout == 0 {
            return Err("Max timeout must be greater than 0".to_string());
        }

        if self.concurrent_tries == 0 {
            return Err("Concurrent tries must be greater than 0".to_string());
        }

        if self.proxy_list.is_empty() {
            return Err("Proxy list path must not be empty".to_string());
        }

        Ok(())
    }

    /// Returns the per-request budget as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout)
    }

    /// Returns the socket address the gateway binds to (`0.0.0.0:port`).
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Returns whether inbound requests must carry a matching API key.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        !self.server_api_key.is_empty()
    }
}
