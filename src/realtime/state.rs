//! Connection state tracking for the real-time client

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Lifecycle state of the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Never connected, or dropped and waiting for the reconnect timer
    Disconnected,
    /// Handshake in flight
    Connecting,
    /// Socket open
    Connected,
    /// Reconnect attempt in flight
    Reconnecting,
    /// Closed by `disconnect`
    Closed,
    /// Reconnect budget exhausted
    Abandoned,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Closed => write!(f, "Closed"),
            Self::Abandoned => write!(f, "Abandoned"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct InternalState {
    pub state: ConnectionState,
    /// Consecutive reconnect attempts since the last successful open
    pub reconnect_attempts: u32,
    pub last_connected: Option<Instant>,
    pub last_message: Option<Instant>,
    pub last_ping: Option<Instant>,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            last_connected: None,
            last_message: None,
            last_ping: None,
        }
    }
}

impl InternalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_connecting(&mut self) {
        self.state = if self.reconnect_attempts > 0 {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Connecting
        };
    }

    pub fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        self.last_connected = Some(Instant::now());
    }

    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Count a new reconnect attempt and return its number
    pub fn begin_reconnect(&mut self) -> u32 {
        self.reconnect_attempts += 1;
        self.state = ConnectionState::Reconnecting;
        self.reconnect_attempts
    }

    /// Start a fresh retry budget without opening a connection
    pub fn reset_attempts(&mut self) {
        self.reconnect_attempts = 0;
    }

    pub fn mark_closed(&mut self) {
        self.state = ConnectionState::Closed;
    }

    pub fn mark_abandoned(&mut self) {
        self.state = ConnectionState::Abandoned;
    }

    pub fn record_message(&mut self) {
        self.last_message = Some(Instant::now());
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_resets_attempts() {
        let mut state = InternalState::new();
        assert_eq!(state.begin_reconnect(), 1);
        assert_eq!(state.begin_reconnect(), 2);
        state.mark_connecting();
        assert_eq!(state.state, ConnectionState::Reconnecting);

        state.mark_connected();
        assert!(state.state.is_connected());
        assert_eq!(state.reconnect_attempts, 0);
        assert!(state.last_connected.is_some());

        state.mark_connecting();
        assert_eq!(state.state, ConnectionState::Connecting);
    }

    #[test]
    fn test_reset_attempts_after_give_up() {
        let mut state = InternalState::new();
        state.begin_reconnect();
        state.mark_abandoned();
        assert_eq!(state.state, ConnectionState::Abandoned);

        state.reset_attempts();
        state.mark_connecting();
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.state, ConnectionState::Connecting);
    }
}
