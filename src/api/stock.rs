//! Market data, news and sync endpoints under `/stock/`

use serde_json::Value;
use tracing::instrument;

use super::http::ApiClient;
use super::messages::{
    KlineQuery, NewsDraft, PageQuery, SearchQuery, StockListQuery, StockSyncRequest,
};
use crate::common::errors::Result;
use crate::common::types::{NewsItem, Page, RealtimeQuote, StockSummary};

/// Endpoints under `/stock/`
#[derive(Debug, Clone, Copy)]
pub struct StockApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn stock(&self) -> StockApi<'_> {
        StockApi { client: self }
    }
}

impl<'a> StockApi<'a> {
    // ========================================================================
    // Listings
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn list(&self, query: &StockListQuery) -> Result<Page<StockSummary>> {
        self.client.get_with_query("/stock/list/", query).await
    }

    pub async fn detail(&self, ts_code: &str) -> Result<Value> {
        self.client
            .get(&format!("/stock/detail/{}/", ts_code))
            .await
    }

    pub async fn hot(&self, limit: Option<u32>) -> Result<Vec<StockSummary>> {
        let query = SearchQuery {
            limit,
            ..SearchQuery::default()
        };
        self.client.get_with_query("/stock/hot/", &query).await
    }

    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str, limit: Option<u32>) -> Result<Vec<StockSummary>> {
        let query = SearchQuery {
            keyword: Some(keyword.to_string()),
            limit,
            ..SearchQuery::default()
        };
        self.client.get_with_query("/stock/search/", &query).await
    }

    pub async fn industries(&self) -> Result<Value> {
        self.client.get("/stock/industries/").await
    }

    // ========================================================================
    // Real-time
    // ========================================================================

    pub async fn realtime_data(&self, ts_code: &str) -> Result<Value> {
        self.client
            .get(&format!("/stock/realtime/data/{}/", ts_code))
            .await
    }

    /// Intraday minute chart
    pub async fn intraday_chart(&self, ts_code: &str) -> Result<Value> {
        self.client
            .get(&format!("/stock/realtime/chart/{}/", ts_code))
            .await
    }

    #[instrument(skip(self))]
    pub async fn realtime_price(&self, ts_code: &str) -> Result<RealtimeQuote> {
        self.client
            .get(&format!("/stock/realtime/price/{}/", ts_code))
            .await
    }

    pub async fn realtime(&self, ts_code: &str) -> Result<Value> {
        self.client
            .get(&format!("/stock/realtime/{}/", ts_code))
            .await
    }

    pub async fn market_overview(&self) -> Result<Value> {
        self.client.get("/stock/market/overview/").await
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    pub async fn kline(&self, ts_code: &str, query: &KlineQuery) -> Result<Value> {
        self.client
            .get_with_query(&format!("/stock/kline/{}/", ts_code), query)
            .await
    }

    pub async fn technical_analysis(&self, ts_code: &str) -> Result<Value> {
        self.client
            .get(&format!("/stock/technical/{}/", ts_code))
            .await
    }

    pub async fn holders(&self, ts_code: &str) -> Result<Value> {
        self.client
            .get(&format!("/stock/holders/{}/", ts_code))
            .await
    }

    // ========================================================================
    // News
    // ========================================================================

    pub async fn news(&self, query: &PageQuery) -> Result<Page<NewsItem>> {
        self.client.get_with_query("/stock/news/", query).await
    }

    pub async fn news_detail(&self, news_id: i64) -> Result<NewsItem> {
        self.client
            .get(&format!("/stock/news/{}/", news_id))
            .await
    }

    pub async fn latest_news(&self, limit: Option<u32>, category: Option<&str>) -> Result<Vec<NewsItem>> {
        let query = SearchQuery {
            limit,
            category: category.map(str::to_string),
            ..SearchQuery::default()
        };
        self.client
            .get_with_query("/stock/news/latest/", &query)
            .await
    }

    pub async fn news_categories(&self) -> Result<Value> {
        self.client.get("/stock/news/categories/").await
    }

    /// Admin only
    pub async fn create_news(&self, draft: &NewsDraft) -> Result<Value> {
        self.client.post("/stock/news/create/", draft).await
    }

    // ========================================================================
    // Sync (super admin)
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn sync_stock_data(&self, request: &StockSyncRequest) -> Result<Value> {
        self.client.post("/stock/sync/", request).await
    }

    pub async fn sync_news(&self) -> Result<Value> {
        self.client.post_empty("/stock/news/sync/").await
    }
}
