use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default config file, read from the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "deckroom.toml";

/// Top-level server configuration, loaded from `deckroom.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Human-readable line returned by the status endpoint.
    pub status_message: String,
    pub limits: LimitsConfig,
    pub sessions: SessionsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            status_message: "Deckroom server running".to_string(),
            limits: LimitsConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

/// Connection caps, buffer sizes, rate limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Maximum concurrent WebSocket connections per IP address.
    pub max_ws_per_ip: usize,
    /// Inbound frames per second allowed on one connection.
    pub ws_rate_limit_per_sec: f64,
    /// Outbound notifications buffered per connection before drops.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            max_ws_per_ip: 10,
            ws_rate_limit_per_sec: 20.0,
            player_message_buffer: 64,
        }
    }
}

/// Session reclamation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("listen_addr {0:?} is not a valid socket address")]
    InvalidListenAddr(String),
    #[error("{0} must be a positive number")]
    MustBePositive(&'static str),
}

impl ServerConfig {
    /// Check every limit, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        let positive = [
            ("limits.max_ws_connections", self.limits.max_ws_connections),
            ("limits.max_ws_per_ip", self.limits.max_ws_per_ip),
            (
                "limits.player_message_buffer",
                self.limits.player_message_buffer,
            ),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::MustBePositive(name));
            }
        }
        let rate = self.limits.ws_rate_limit_per_sec;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::MustBePositive("limits.ws_rate_limit_per_sec"));
        }
        if self.sessions.idle_timeout_secs == 0 {
            return Err(ConfigError::MustBePositive("sessions.idle_timeout_secs"));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::MustBePositive("sessions.sweep_interval_secs"));
        }

        if self.sessions.sweep_interval_secs > self.sessions.idle_timeout_secs {
            tracing::warn!(
                sweep_interval_secs = self.sessions.sweep_interval_secs,
                idle_timeout_secs = self.sessions.idle_timeout_secs,
                "Sweep interval exceeds idle timeout; idle sessions will linger past the timeout"
            );
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }

    /// Load config from `DECKROOM_CONFIG` (or `deckroom.toml`) if it exists,
    /// then apply env var overrides.
    pub fn load() -> Self {
        let path =
            std::env::var("DECKROOM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "No config file found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from an environment-like lookup. Unparseable or empty
    /// values are ignored.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| get(key).filter(|v| !v.is_empty());

        if let Some(addr) = var("DECKROOM_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        // Plain `PORT` replaces only the port, as hosting platforms expect.
        if let Some(port) = var("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.listen_addr = match self.listen_addr.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                },
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }
        if let Some(n) = var("DECKROOM_IDLE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.sessions.idle_timeout_secs = n;
        }
        if let Some(n) = var("DECKROOM_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.sessions.sweep_interval_secs = n;
        }
        if let Some(n) = var("DECKROOM_MAX_WS_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.limits.max_ws_connections = n;
        }
        if let Some(n) = var("DECKROOM_WS_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.limits.ws_rate_limit_per_sec = n;
        }
    }
}
