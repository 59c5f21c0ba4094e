//! Login and logout

use tracing::{info, instrument};

use super::http::ApiClient;
use super::messages::{LoginRequest, LoginResponse};
use crate::common::errors::{ClientError, Result};

impl ApiClient {
    /// Log in and store the token, user and menus in the session
    ///
    /// The login endpoint answers with `token` and `user` at the top level
    /// instead of inside `data`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let envelope = self
            .post_envelope("/user/login", &LoginRequest { username, password })
            .await?;

        let body = serde_json::Value::Object(envelope.extra.into_iter().collect());
        let login: LoginResponse = serde_json::from_value(body).map_err(|e| {
            ClientError::InvalidResponse(format!("Malformed login response: {}", e))
        })?;

        self.session().login(
            login.token.clone(),
            login.user.clone(),
            login.menu_list.clone(),
        );
        info!("Logged in as {}", login.user.username);
        Ok(login)
    }

    /// End the session locally; the token is stateless so there is no server call
    pub fn logout(&self) {
        self.session().logout();
    }
}
