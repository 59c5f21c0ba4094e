//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Real-time push configuration
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dashboard backend
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
    /// Token to start the session with (normally obtained by logging in)
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_seconds: default_request_timeout(),
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

/// Real-time push configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket base URL; the room path is appended
    #[serde(default = "default_ws_url")]
    pub websocket_url: String,
    /// Push room name
    #[serde(default = "default_room")]
    pub room: String,
    /// Ping interval in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Fixed delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
    /// Reconnection attempts after a drop before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Ticker codes subscribed at startup
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            websocket_url: default_ws_url(),
            room: default_room(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            reconnect_interval_ms: default_reconnect_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_seconds: default_connect_timeout(),
            subscriptions: Vec::new(),
        }
    }
}

impl RealtimeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        // tokio intervals reject a zero period
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the reconnect delay and attempt budget
    pub fn with_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.reconnect_interval_ms = interval.as_millis() as u64;
        self.max_reconnect_attempts = max_attempts;
        self
    }
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_room() -> String {
    "general".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

fn default_reconnect_interval() -> u64 {
    3_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Buffer size of the channel fed by the CLI's forwarding listeners
    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_channel_size: default_event_channel_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_channel_size() -> usize {
    1000
}
