//! Account, order, watchlist and admin endpoints under `/trading/`

use serde_json::Value;
use tracing::{info, instrument};

use super::http::ApiClient;
use super::messages::{
    AssetAdjustment, CancelTrade, FreezeUser, NewsDraft, PageQuery, TradeOrder, WatchlistEntry,
};
use crate::common::errors::Result;
use crate::common::types::{NewsItem, Page, TradeSide};

/// Endpoints under `/trading/`
#[derive(Debug, Clone, Copy)]
pub struct TradingApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn trading(&self) -> TradingApi<'_> {
        TradingApi { client: self }
    }
}

impl<'a> TradingApi<'a> {
    // ========================================================================
    // Account
    // ========================================================================

    pub async fn account(&self) -> Result<Value> {
        self.client.get("/trading/account/").await
    }

    pub async fn positions(&self) -> Result<Value> {
        self.client.get("/trading/positions/").await
    }

    pub async fn records(&self, query: &PageQuery) -> Result<Value> {
        self.client.get_with_query("/trading/records/", query).await
    }

    pub async fn statistics(&self, query: &PageQuery) -> Result<Value> {
        self.client
            .get_with_query("/trading/statistics/", query)
            .await
    }

    // ========================================================================
    // Watchlist
    // ========================================================================

    pub async fn watchlist(&self) -> Result<Value> {
        self.client.get("/trading/watchlist/").await
    }

    pub async fn add_to_watchlist(&self, ts_code: &str) -> Result<Value> {
        let entry = WatchlistEntry {
            ts_code: ts_code.to_string(),
        };
        self.client.post("/trading/watchlist/add/", &entry).await
    }

    pub async fn remove_from_watchlist(&self, ts_code: &str) -> Result<Value> {
        self.client
            .delete(&format!("/trading/watchlist/remove/{}/", ts_code))
            .await
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Place an order; all validation happens server-side
    #[instrument(skip(self))]
    pub async fn place_order(&self, side: TradeSide, order: &TradeOrder) -> Result<Value> {
        let path = match side {
            TradeSide::Buy => "/trading/buy/",
            TradeSide::Sell => "/trading/sell/",
        };
        let result = self.client.post(path, order).await?;
        info!("{} {} x{} @ {} accepted", side, order.ts_code, order.shares, order.price);
        Ok(result)
    }

    pub async fn buy(&self, order: &TradeOrder) -> Result<Value> {
        self.place_order(TradeSide::Buy, order).await
    }

    pub async fn sell(&self, order: &TradeOrder) -> Result<Value> {
        self.place_order(TradeSide::Sell, order).await
    }

    pub async fn cancel(&self, trade_id: i64) -> Result<Value> {
        self.client
            .post("/trading/cancel/", &CancelTrade { trade_id })
            .await
    }

    // ========================================================================
    // News
    // ========================================================================

    pub async fn news(&self, query: &PageQuery) -> Result<Page<NewsItem>> {
        self.client.get_with_query("/trading/news/", query).await
    }

    pub async fn news_detail(&self, news_id: i64) -> Result<NewsItem> {
        self.client
            .get(&format!("/trading/news/{}/", news_id))
            .await
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub async fn admin_records(&self, query: &PageQuery) -> Result<Value> {
        self.client
            .get_with_query("/trading/admin/records/", query)
            .await
    }

    pub async fn admin_accounts(&self, query: &PageQuery) -> Result<Value> {
        self.client
            .get_with_query("/trading/admin/accounts/", query)
            .await
    }

    #[instrument(skip(self))]
    pub async fn adjust_assets(&self, adjustment: &AssetAdjustment) -> Result<Value> {
        self.client
            .post("/trading/admin/assets/adjust/", adjustment)
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_trading_frozen(&self, user_id: i64, freeze: bool) -> Result<Value> {
        self.client
            .post(
                "/trading/admin/freeze-user/",
                &FreezeUser { user_id, freeze },
            )
            .await
    }

    pub async fn fetch_latest_news(&self, params: &Value) -> Result<Value> {
        self.client
            .post("/trading/admin/news/fetch/", params)
            .await
    }

    pub async fn admin_news(&self, query: &PageQuery) -> Result<Page<NewsItem>> {
        self.client
            .get_with_query("/trading/admin/news/", query)
            .await
    }

    pub async fn create_news(&self, draft: &NewsDraft) -> Result<Value> {
        self.client
            .post("/trading/admin/news/create/", draft)
            .await
    }

    pub async fn update_news(&self, news_id: i64, draft: &NewsDraft) -> Result<Value> {
        self.client
            .put(&format!("/trading/admin/news/{}/update/", news_id), draft)
            .await
    }

    pub async fn delete_news(&self, news_id: i64) -> Result<Value> {
        self.client
            .delete(&format!("/trading/admin/news/{}/delete/", news_id))
            .await
    }
}
