//! REST API wrappers for the dashboard backend

pub mod auth;
pub mod http;
pub mod messages;
pub mod stock;
pub mod trading;

pub use http::ApiClient;
pub use stock::StockApi;
pub use trading::TradingApi;
