//! Request and response payloads of the dashboard REST API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::session::store::{MenuItem, UserProfile};

/// Every endpoint answers `{code, msg, data}`; the auth middleware uses
/// `message` instead of `msg`, and a few views use `info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default = "default_code")]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Top-level fields outside the usual envelope (`token`, `user`, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_code() -> i64 {
    200
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Human-readable message, whichever key carried it
    pub fn message_text(&self) -> Option<String> {
        self.msg
            .clone()
            .or_else(|| self.info.clone())
            .or_else(|| self.message.clone())
    }
}

/// `POST /user/login` body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// What a successful login yields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
    #[serde(default, rename = "menuList")]
    pub menu_list: Vec<MenuItem>,
}

/// Filters of `GET /stock/list/`
#[derive(Debug, Clone, Default, Serialize)]
pub struct StockListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "pageSize", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
}

/// `keyword`/`limit` filters of search and hot lists
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// K-line period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KlinePeriod {
    Daily,
    Weekly,
    Monthly,
}

/// Price adjustment of K-line bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceAdjust {
    /// Forward adjusted
    Qfq,
    /// Backward adjusted
    Hfq,
    None,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KlineQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<KlinePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjust: Option<PriceAdjust>,
}

/// Paging and filters shared by record, account and news lists
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "pageSize", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl PageQuery {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            ..Self::default()
        }
    }
}

/// What `POST /stock/sync/` refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Basic,
    Daily,
    Company,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockSyncRequest {
    #[serde(rename = "type")]
    pub kind: SyncKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts_codes: Option<Vec<String>>,
}

/// Buy or sell order; validated server-side only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOrder {
    pub ts_code: String,
    pub price: Decimal,
    pub shares: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntry {
    pub ts_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelTrade {
    pub trade_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetAdjustment {
    pub user_id: i64,
    pub adjust_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FreezeUser {
    pub user_id: i64,
    /// True freezes trading, false lifts the freeze
    pub freeze: bool,
}

/// Body of the news create/update endpoints
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewsDraft {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
