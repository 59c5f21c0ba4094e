//! Integration tests for the REST wrappers against a mocked backend

mod common;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_dashboard_client::api::messages::{StockListQuery, TradeOrder};
use stock_dashboard_client::{ApiClient, ClientError, SessionStore};

async fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
    let session = SessionStore::new();
    session.set_token(token.map(str::to_string));
    ApiClient::new(&server.uri(), session).unwrap()
}

#[tokio::test]
async fn test_bearer_token_and_data_unwrapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stock/realtime/price/000001.SZ/"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": {
                "ts_code": "000001.SZ",
                "current_price": 10.52,
                "open_price": 10.3,
                "high_price": 10.6,
                "low_price": 10.25,
                "change": 0.22,
                "pct_chg": 2.14,
                "volume": 1520000,
                "amount": 15980000.0,
                "is_real_time": true
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("tok-123")).await;
    let quote = client.stock().realtime_price("000001.SZ").await.unwrap();

    assert_eq!(quote.ts_code, "000001.SZ");
    assert_eq!(quote.current_price, dec!(10.52));
    assert!(quote.is_up());
}

#[tokio::test]
async fn test_list_sends_paging_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stock/list/"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "20"))
        .and(query_param("industry", "银行"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": {
                "list": [{"ts_code": "000001.SZ", "name": "平安银行", "industry": "银行"}],
                "total": 41,
                "page": 2,
                "pageSize": 20,
                "totalPages": 3
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    let query = StockListQuery {
        page: Some(2),
        page_size: Some(20),
        industry: Some("银行".into()),
        ..StockListQuery::default()
    };
    let page = client.stock().list(&query).await.unwrap();

    assert_eq!(page.total, 41);
    assert_eq!(page.list.len(), 1);
    assert!(page.has_next());
}

#[tokio::test]
async fn test_business_error_code_maps_to_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trading/buy/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 400,
            "msg": "可用资金不足"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Some("tok")).await;
    let order = TradeOrder {
        ts_code: "600519.SH".into(),
        price: dec!(1700.00),
        shares: 100,
    };
    let err = client.trading().buy(&order).await.unwrap_err();

    match err {
        ClientError::BadRequest(message) => assert_eq!(message, "可用资金不足"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(client.session().token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_buy_posts_order_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trading/buy/"))
        .and(body_json(json!({
            "ts_code": "000001.SZ",
            "price": "10.50",
            "shares": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "买入成功",
            "data": {"trade_id": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("tok")).await;
    let order = TradeOrder {
        ts_code: "000001.SZ".into(),
        price: dec!(10.50),
        shares: 100,
    };
    let result = client.trading().buy(&order).await.unwrap();

    assert_eq!(result["trade_id"], 7);
}

#[tokio::test]
async fn test_http_401_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trading/account/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "message": "Token已过期"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Some("stale")).await;
    let err = client.trading().account().await.unwrap_err();

    assert!(err.is_auth_failure());
    assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "Token已过期"));
    assert_eq!(client.session().token(), None);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_http_403_maps_to_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trading/admin/accounts/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": 403,
            "msg": "权限不足"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Some("tok")).await;
    let err = client
        .trading()
        .admin_accounts(&Default::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Forbidden(ref m) if m == "权限不足"));
    assert_eq!(client.session().token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_non_json_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stock/market/overview/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    let err = client.stock().market_overview().await.unwrap_err();

    assert!(matches!(err, ClientError::Api { code: 502, .. }));
}

#[tokio::test]
async fn test_login_populates_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .and(body_json(json!({"username": "admin", "password": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "登录成功",
            "token": "jwt-token",
            "user": {
                "id": 1,
                "username": "admin",
                "roles": "管理员,普通用户",
                "account_balance": "100000.00"
            },
            "menuList": [{
                "name": "系统管理",
                "path": "/sys",
                "children": [{"name": "用户管理", "path": "/sys/user", "perms": "system:user:list"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trading/positions/"))
        .and(header("authorization", "Bearer jwt-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    let login = client.login("admin", "123456").await.unwrap();

    assert_eq!(login.token, "jwt-token");
    let session = client.session();
    assert_eq!(session.token().as_deref(), Some("jwt-token"));
    assert_eq!(
        session.current_user().map(|u| u.username),
        Some("admin".to_string())
    );
    assert_eq!(session.permissions(), vec!["system:user:list".to_string()]);

    let positions = client.trading().positions().await.unwrap();
    assert_eq!(positions, json!([]));

    client.logout();
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 500,
            "msg": "用户名或者密码错误！"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, None).await;
    let err = client.login("admin", "wrong").await.unwrap_err();

    assert!(matches!(err, ClientError::Server(ref m) if m == "用户名或者密码错误！"));
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_remove_from_watchlist_uses_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/trading/watchlist/remove/000001.SZ/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "已移除"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("tok")).await;
    let result = client
        .trading()
        .remove_from_watchlist("000001.SZ")
        .await
        .unwrap();

    assert_eq!(result, serde_json::Value::Null);
}
