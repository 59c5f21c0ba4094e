//! Shared types used by the REST wrappers and the real-time client

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::realtime::messages::MessageKind;

/// Connection status published by the real-time client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Socket open, heartbeat running
    Connected,
    /// Socket closed, optionally with the reason sent by the server
    Disconnected(Option<String>),
    /// A reconnect attempt is about to start
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// Retry budget exhausted; the client stays offline until `connect` is called again
    GaveUp,
    /// Transport error
    Error(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected(Some(reason)) => write!(f, "disconnected ({})", reason),
            ConnectionStatus::Disconnected(None) => write!(f, "disconnected"),
            ConnectionStatus::Reconnecting {
                attempt,
                max_attempts,
            } => write!(f, "reconnecting ({}/{})", attempt, max_attempts),
            ConnectionStatus::GaveUp => write!(f, "gave up reconnecting"),
            ConnectionStatus::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// Buy or sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// Latest price snapshot for one ticker, as pushed in `realtime_data` and
/// `stock_price` frames and returned by `/stock/realtime/price/{ts_code}/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeQuote {
    pub ts_code: String,
    pub current_price: Decimal,
    #[serde(default)]
    pub open_price: Decimal,
    #[serde(default)]
    pub high_price: Decimal,
    #[serde(default)]
    pub low_price: Decimal,
    #[serde(default)]
    pub change: Decimal,
    /// Percent change versus previous close
    #[serde(default)]
    pub pct_chg: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub amount: Decimal,
    /// ISO-8601 local time string as produced by the server
    #[serde(default)]
    pub timestamp: Option<String>,
    /// False when the quote falls back to the last daily bar
    #[serde(default)]
    pub is_real_time: bool,
}

impl RealtimeQuote {
    /// Whether the ticker is up on the day
    pub fn is_up(&self) -> bool {
        self.change > Decimal::ZERO
    }
}

/// Row of the stock list and search endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSummary {
    pub ts_code: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub list_date: Option<String>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub change: Option<Decimal>,
    #[serde(default)]
    pub pct_chg: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub trade_date: Option<String>,
}

/// Paginated list envelope used by list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(rename = "pageSize", default)]
    pub page_size: u32,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

fn default_page() -> u32 {
    1
}

impl<T> Page<T> {
    /// Whether more pages follow this one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// News article as listed by the news endpoints and pushed in `news_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

/// A dispatched real-time frame, as forwarded by
/// [`ChannelHandler`](crate::common::channels::ChannelHandler)
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl RealtimeEvent {
    pub fn new(kind: MessageKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Decode the payload into a typed value
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_quote_from_server_floats() {
        let quote: RealtimeQuote = serde_json::from_value(json!({
            "ts_code": "000001.SZ",
            "current_price": 12.34,
            "open_price": 12.0,
            "high_price": 12.5,
            "low_price": 11.9,
            "change": 0.34,
            "pct_chg": 2.83,
            "volume": 123456,
            "amount": 1523000.5,
            "timestamp": "2024-01-02T10:00:00",
            "is_real_time": true
        }))
        .unwrap();

        assert_eq!(quote.ts_code, "000001.SZ");
        assert_eq!(quote.current_price, dec!(12.34));
        assert_eq!(quote.volume, dec!(123456));
        assert!(quote.is_real_time);
        assert!(quote.is_up());
    }

    #[test]
    fn test_page_navigation() {
        let page: Page<StockSummary> = serde_json::from_value(json!({
            "list": [{"ts_code": "600000.SH", "name": "浦发银行"}],
            "total": 41,
            "page": 2,
            "pageSize": 20,
            "totalPages": 3
        }))
        .unwrap();

        assert_eq!(page.list.len(), 1);
        assert_eq!(page.page_size, 20);
        assert!(page.has_next());
        assert_eq!(page.list[0].current_price, None);
    }

    #[test]
    fn test_connection_status_display() {
        let status = ConnectionStatus::Reconnecting {
            attempt: 2,
            max_attempts: 5,
        };
        assert_eq!(status.to_string(), "reconnecting (2/5)");
        assert_eq!(ConnectionStatus::GaveUp.to_string(), "gave up reconnecting");
    }
}
