//! Authenticated HTTP client for the dashboard backend

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::messages::ApiEnvelope;
use crate::common::errors::{ClientError, Result};
use crate::config::types::ApiConfig;
use crate::session::store::SessionStore;

/// HTTP client that attaches the session token and unwraps `{code, msg, data}`
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Create a client with the default 15 second timeout
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(15), session)
    }

    /// Create a client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration, session: SessionStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &ApiConfig, session: SessionStore) -> Result<Self> {
        if let Some(token) = &config.token {
            session.set_token(Some(token.clone()));
        }
        Self::with_timeout(&config.base_url, config.timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let request = self.client.request(method, url);
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send the request and return the envelope of a successful call
    ///
    /// A non-2xx status or a `code` other than 200 becomes an error; 401
    /// also ends the session.
    #[instrument(skip(self, request))]
    pub async fn execute_envelope(&self, request: RequestBuilder) -> Result<ApiEnvelope> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope>(&body)
                .ok()
                .and_then(|env| env.message_text());
            return Err(self.fail(i64::from(status.as_u16()), message));
        }

        let envelope: ApiEnvelope = serde_json::from_str(&body).map_err(|e| {
            ClientError::InvalidResponse(format!("Unexpected response body: {} - {}", e, body))
        })?;
        if !envelope.is_success() {
            let message = envelope.message_text();
            return Err(self.fail(envelope.code, message));
        }
        Ok(envelope)
    }

    /// Send the request and decode the `data` field
    pub async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let envelope = self.execute_envelope(request).await?;
        let data = envelope.data.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.request(Method::GET, path).query(query))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.request(Method::POST, path).json(body))
            .await
    }

    /// POST without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.request(Method::POST, path)).await
    }

    /// POST returning the whole envelope, for endpoints that answer outside `data`
    pub async fn post_envelope<B>(&self, path: &str, body: &B) -> Result<ApiEnvelope>
    where
        B: Serialize + ?Sized,
    {
        self.execute_envelope(self.request(Method::POST, path).json(body))
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.request(Method::PUT, path).json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.request(Method::DELETE, path)).await
    }

    fn fail(&self, code: i64, message: Option<String>) -> ClientError {
        if code == 401 {
            warn!("Session rejected by server, clearing credentials");
            self.session.clear();
        }
        error_for_code(code, message)
    }
}

/// Map a status or business code to an error
pub fn error_for_code(code: i64, message: Option<String>) -> ClientError {
    match code {
        400 => ClientError::BadRequest(
            message.unwrap_or_else(|| "invalid request parameters".to_string()),
        ),
        401 => ClientError::Unauthorized(
            message.unwrap_or_else(|| "authentication failed, please log in again".to_string()),
        ),
        403 => ClientError::Forbidden(message.unwrap_or_else(|| "permission denied".to_string())),
        404 => ClientError::NotFound(
            message.unwrap_or_else(|| "requested resource does not exist".to_string()),
        ),
        500 => ClientError::Server(message.unwrap_or_else(|| "internal server error".to_string())),
        _ => ClientError::Api {
            code,
            message: message.unwrap_or_else(|| format!("request failed ({})", code)),
        },
    }
}
