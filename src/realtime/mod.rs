//! Real-time quote push over WebSocket

pub mod handlers;
pub mod messages;
pub mod state;
pub mod websocket;

pub use handlers::{HandlerId, HandlerRegistry};
pub use messages::{InboundMessage, MessageKind, OutboundMessage};
pub use state::ConnectionState;
pub use websocket::RealtimeClient;
