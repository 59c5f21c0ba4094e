//! Stock Dashboard Client Library
//!
//! Client SDK for the stock trading dashboard: a real-time quote push
//! client over WebSocket, REST wrappers for the market, trading and admin
//! endpoints, and the session store with permission gates.

pub mod api;
pub mod common;
pub mod config;
pub mod realtime;
pub mod session;

// Re-export commonly used types
pub use api::ApiClient;
pub use common::channels::{create_event_channel, ChannelHandler};
pub use common::errors::{ClientError, Result};
pub use common::traits::{MessageHandler, StreamClient};
pub use common::types::{
    ConnectionStatus, NewsItem, Page, RealtimeEvent, RealtimeQuote, StockSummary, TradeSide,
};
pub use config::types::{ApiConfig, AppConfig, RealtimeConfig};
pub use realtime::{ConnectionState, HandlerId, MessageKind, OutboundMessage, RealtimeClient};
pub use session::{guard, has_permission, has_role, Navigation, SessionStore};
