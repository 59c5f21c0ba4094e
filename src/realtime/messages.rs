//! Push-service message types
//!
//! Every frame is a JSON text frame carrying a `type` tag. Outbound frames
//! are small commands; inbound frames wrap their body in `data` (or
//! `message` for errors).

use serde::{Deserialize, Serialize};

/// Inbound `type` tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    ConnectionEstablished,
    MarketData,
    RealtimeData,
    NewsUpdate,
    StockPrice,
    SubscriptionSuccess,
    UnsubscriptionSuccess,
    Error,
    Pong,
    Unknown(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::ConnectionEstablished => "connection_established",
            MessageKind::MarketData => "market_data",
            MessageKind::RealtimeData => "realtime_data",
            MessageKind::NewsUpdate => "news_update",
            MessageKind::StockPrice => "stock_price",
            MessageKind::SubscriptionSuccess => "subscription_success",
            MessageKind::UnsubscriptionSuccess => "unsubscription_success",
            MessageKind::Error => "error",
            MessageKind::Pong => "pong",
            MessageKind::Unknown(other) => other,
        }
    }

    /// Kinds whose payload is handed to registered listeners
    pub fn is_dispatchable(&self) -> bool {
        matches!(
            self,
            MessageKind::MarketData
                | MessageKind::RealtimeData
                | MessageKind::NewsUpdate
                | MessageKind::StockPrice
                | MessageKind::Error
        )
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "connection_established" => MessageKind::ConnectionEstablished,
            "market_data" => MessageKind::MarketData,
            "realtime_data" => MessageKind::RealtimeData,
            "news_update" => MessageKind::NewsUpdate,
            "stock_price" => MessageKind::StockPrice,
            "subscription_success" => MessageKind::SubscriptionSuccess,
            "unsubscription_success" => MessageKind::UnsubscriptionSuccess,
            "error" => MessageKind::Error,
            "pong" => MessageKind::Pong,
            _ => MessageKind::Unknown(tag),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        MessageKind::from(tag.to_string())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame received from the push server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Present on `subscription_success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_stocks: Option<Vec<String>>,
}

impl InboundMessage {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Body handed to listeners: `data`, else `message`, else `null`
    pub fn payload(&self) -> serde_json::Value {
        match (&self.data, &self.message) {
            (Some(data), _) => data.clone(),
            (None, Some(message)) => serde_json::Value::String(message.clone()),
            (None, None) => serde_json::Value::Null,
        }
    }
}

/// Command sent to the push server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Subscribe { ts_codes: Vec<String> },
    Unsubscribe { ts_codes: Vec<String> },
    Ping,
    GetPrice { ts_code: String },
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
