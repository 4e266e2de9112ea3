//! Client and server configuration.
//!
//! Both config types follow the same surface: a defaults struct, a
//! `Default` impl, chainable `with_*` builders, `from_env`, and
//! `validate`. Environment variables use the `HOLLER_` prefix.

use crate::errors::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default client settings.
pub struct ClientDefaults;

impl ClientDefaults {
    pub const SERVER_ADDRESS: &'static str = "ws://127.0.0.1:8025/websockets";
    pub const REQUEST_PATH: &'static str = "/hello";
    pub const CONNECT_TIMEOUT_MS: u64 = 5_000;
    pub const RESPONSE_TIMEOUT_MS: u64 = 5_000;
    pub const CANCEL_POLICY: &'static str = "silent";
}

/// Default server settings.
pub struct ServerDefaults;

impl ServerDefaults {
    pub const BIND_ADDR: &'static str = "127.0.0.1:8025";
    pub const ENDPOINT_PATH: &'static str = "/websockets/hello";
    pub const GREETING: &'static str = "Hello";
}

/// How a cancelled request task reports its ending.
///
/// `Silent` resolves the task with [`TaskOutcome::Cancelled`] so callers
/// that treat cancellation as routine see a clean completion. `Strict`
/// fails the task with [`RequestError::Cancelled`] instead.
///
/// [`TaskOutcome::Cancelled`]: crate::task::TaskOutcome::Cancelled
/// [`RequestError::Cancelled`]: crate::errors::RequestError::Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    #[default]
    Silent,
    Strict,
}

impl FromStr for CancelPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown cancel policy `{other}`")),
        }
    }
}

/// Settings for outbound request tasks.
///
/// The target is fixed per config, not per request: `server_address` is the
/// WebSocket base URL and `request_path` names the endpoint under it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base WebSocket URL of the server, e.g. `ws://127.0.0.1:8025/websockets`.
    pub server_address: String,
    /// Endpoint path appended to the base URL.
    pub request_path: String,
    /// Bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Bound on waiting for the reply once the request is sent.
    pub response_timeout: Duration,
    /// How cancellation is reported.
    pub cancel_policy: CancelPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: ClientDefaults::SERVER_ADDRESS.to_string(),
            request_path: ClientDefaults::REQUEST_PATH.to_string(),
            connect_timeout: Duration::from_millis(ClientDefaults::CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(ClientDefaults::RESPONSE_TIMEOUT_MS),
            cancel_policy: CancelPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = address.into();
        self
    }

    pub fn with_request_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = path.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    /// Full URL of the request endpoint.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.server_address.trim_end_matches('/'),
            self.request_path
        )
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let server_address =
            get_env_or_default("HOLLER_SERVER_ADDRESS", ClientDefaults::SERVER_ADDRESS)?;

        let request_path = get_env_or_default("HOLLER_REQUEST_PATH", ClientDefaults::REQUEST_PATH)?;

        let connect_timeout = get_env_or_default(
            "HOLLER_CONNECT_TIMEOUT_MS",
            &ClientDefaults::CONNECT_TIMEOUT_MS.to_string(),
        )?
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            field: "connect_timeout".to_string(),
            value: env::var("HOLLER_CONNECT_TIMEOUT_MS").unwrap_or_default(),
            expected: "whole milliseconds".to_string(),
        })?;

        let response_timeout = get_env_or_default(
            "HOLLER_RESPONSE_TIMEOUT_MS",
            &ClientDefaults::RESPONSE_TIMEOUT_MS.to_string(),
        )?
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            field: "response_timeout".to_string(),
            value: env::var("HOLLER_RESPONSE_TIMEOUT_MS").unwrap_or_default(),
            expected: "whole milliseconds".to_string(),
        })?;

        let cancel_policy = get_env_or_default("HOLLER_CANCEL_POLICY", ClientDefaults::CANCEL_POLICY)?
            .parse::<CancelPolicy>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "cancel_policy".to_string(),
                value: env::var("HOLLER_CANCEL_POLICY").unwrap_or_default(),
                expected: "silent or strict".to_string(),
            })?;

        Ok(Self {
            server_address,
            request_path,
            connect_timeout,
            response_timeout,
            cancel_policy,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.server_address).map_err(|err| {
            ConfigError::validation_failed(format!(
                "server address `{}` is not a valid URL: {err}",
                self.server_address
            ))
        })?;

        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ConfigError::validation_failed(
                "Server address scheme must be ws or wss",
            ));
        }

        if self.request_path.is_empty() || !self.request_path.starts_with('/') {
            return Err(ConfigError::validation_failed(
                "Request path must be non-empty and start with '/'",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ConfigError::validation_failed(
                "Connect timeout must be greater than 0",
            ));
        }

        if self.response_timeout.is_zero() {
            return Err(ConfigError::validation_failed(
                "Response timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Settings for the bundled greeting server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP address the listener binds to. Use port 0 for an ephemeral port.
    pub bind_addr: String,
    /// Handshake path the server accepts; other paths are rejected with 404.
    pub endpoint_path: String,
    /// Word prepended to each received name when building the reply.
    pub greeting: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ServerDefaults::BIND_ADDR.to_string(),
            endpoint_path: ServerDefaults::ENDPOINT_PATH.to_string(),
            greeting: ServerDefaults::GREETING.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = get_env_or_default("HOLLER_BIND_ADDR", ServerDefaults::BIND_ADDR)?;
        let endpoint_path =
            get_env_or_default("HOLLER_ENDPOINT_PATH", ServerDefaults::ENDPOINT_PATH)?;
        let greeting = get_env_or_default("HOLLER_GREETING", ServerDefaults::GREETING)?;

        Ok(Self {
            bind_addr,
            endpoint_path,
            greeting,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr.parse::<SocketAddr>().map_err(|_| {
            ConfigError::validation_failed(format!(
                "bind address `{}` is not a valid socket address",
                self.bind_addr
            ))
        })?;

        if self.endpoint_path.is_empty() || !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::validation_failed(
                "Endpoint path must be non-empty and start with '/'",
            ));
        }

        if self.greeting.is_empty() {
            return Err(ConfigError::validation_failed(
                "Greeting must not be empty",
            ));
        }

        Ok(())
    }
}

// Helper function for environment variable handling
fn get_env_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}
