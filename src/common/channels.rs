//! Channel helpers for forwarding dispatched frames to other tasks

use tokio::sync::mpsc;
use tracing::warn;

use super::errors::{ClientError, Result};
use super::traits::MessageHandler;
use super::types::RealtimeEvent;
use crate::realtime::messages::MessageKind;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new event channel with the default buffer size
pub fn create_event_channel() -> (mpsc::Sender<RealtimeEvent>, mpsc::Receiver<RealtimeEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new event channel with a custom buffer size
pub fn create_event_channel_with_size(
    size: usize,
) -> (mpsc::Sender<RealtimeEvent>, mpsc::Receiver<RealtimeEvent>) {
    mpsc::channel(size)
}

/// Handler that forwards every payload of one message kind into a channel
///
/// Dispatch runs on the connection task, so forwarding never blocks: a full
/// channel drops the event and reports an error to the dispatcher.
pub struct ChannelHandler {
    kind: MessageKind,
    sender: mpsc::Sender<RealtimeEvent>,
}

impl ChannelHandler {
    pub fn new(kind: MessageKind, sender: mpsc::Sender<RealtimeEvent>) -> Self {
        Self { kind, sender }
    }
}

impl MessageHandler for ChannelHandler {
    fn handle(&self, payload: &serde_json::Value) -> Result<()> {
        let event = RealtimeEvent::new(self.kind.clone(), payload.clone());
        self.sender.try_send(event).map_err(|e| {
            warn!("Dropping {} event: {}", self.kind, e);
            ClientError::ChannelSend(e.to_string())
        })
    }
}
