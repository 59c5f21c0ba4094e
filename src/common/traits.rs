//! Trait definitions for real-time clients and message listeners

use async_trait::async_trait;

use super::errors::Result;

/// Trait for streaming quote clients
///
/// This trait provides a unified interface for connecting to the push
/// service and managing the set of subscribed tickers.
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Connect to the push server; resolves once the socket is open
    async fn connect(&self) -> Result<()>;

    /// Subscribe to ticker codes
    ///
    /// # Arguments
    /// * `ts_codes` - Ticker codes such as `000001.SZ`
    async fn subscribe(&self, ts_codes: &[String]) -> Result<()>;

    /// Unsubscribe from ticker codes
    async fn unsubscribe(&self, ts_codes: &[String]) -> Result<()>;

    /// Close the connection and forget all subscriptions and listeners
    async fn disconnect(&self) -> Result<()>;

    /// Check if the client is currently connected
    fn is_connected(&self) -> bool;
}

/// Listener for one inbound message type
///
/// Errors are logged by the dispatcher and never stop the remaining
/// listeners from running.
pub trait MessageHandler: Send + Sync {
    /// Handle the `data` payload of a dispatched frame
    fn handle(&self, payload: &serde_json::Value) -> Result<()>;
}

impl<F> MessageHandler for F
where
    F: Fn(&serde_json::Value) -> Result<()> + Send + Sync,
{
    fn handle(&self, payload: &serde_json::Value) -> Result<()> {
        self(payload)
    }
}
