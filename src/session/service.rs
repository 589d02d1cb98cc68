use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::client::{HttpClient, HttpResponse};
use crate::session::types::{
    AuthResponse, LoginCredentials, RefreshResponse, RegisterRequest, ResetPasswordConfirm,
    UserProfile,
};

/// Login endpoint path.
pub const LOGIN_ENDPOINT: &str = "/users/auth/login/";
/// Refresh endpoint path. The interceptor treats requests to this path
/// specially: no bearer header on the way out, hard session failure on 401.
pub const REFRESH_ENDPOINT: &str = "/users/auth/refresh-token/";
/// Logout endpoint path.
pub const LOGOUT_ENDPOINT: &str = "/users/auth/logout/";
/// Registration endpoint path.
pub const REGISTER_ENDPOINT: &str = "/users/auth/register/";
/// Password-reset request endpoint path.
pub const PASSWORD_RESET_REQUEST_ENDPOINT: &str = "/users/password/reset/request/";
/// Password-reset token verification endpoint path.
pub const PASSWORD_RESET_VERIFY_ENDPOINT: &str = "/users/password/reset/verify/";
/// Password-reset confirmation endpoint path.
pub const PASSWORD_RESET_ENDPOINT: &str = "/users/password/reset/";
/// Current-user profile endpoint path.
pub const CURRENT_USER_ENDPOINT: &str = "/users/me/";

/// Stateless request/response mapping over the auth endpoints.
///
/// Holds no session state of its own: credentials go in, typed responses
/// come out. Token bookkeeping lives in the session manager.
pub struct AuthApi {
    http: Arc<dyn HttpClient>,
    config: ApiConfig,
}

impl AuthApi {
    pub fn new(http: Arc<dyn HttpClient>, config: ApiConfig) -> Self {
        Self { http, config }
    }

    /// Exchange credentials for tokens and permission codes.
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthResponse> {
        debug!(email = %credentials.email, "Sending login request");
        let response = self
            .http
            .post(
                &self.config.url(LOGIN_ENDPOINT),
                json_headers(None),
                Some(serde_json::to_string(credentials).map_err(decode_err)?),
            )
            .await?;
        decode(response)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshResponse> {
        debug!("Sending token refresh request");
        let response = self
            .http
            .post(
                &self.config.url(REFRESH_ENDPOINT),
                json_headers(None),
                Some(json!({ "refresh": refresh_token }).to_string()),
            )
            .await?;
        decode(response)
    }

    /// Ask the server to invalidate the refresh token.
    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        debug!("Sending logout request");
        let response = self
            .http
            .post(
                &self.config.url(LOGOUT_ENDPOINT),
                json_headers(None),
                Some(json!({ "refresh": refresh_token }).to_string()),
            )
            .await?;
        expect_success(response)
    }

    /// Fetch the authenticated user's profile.
    pub async fn current_user(&self, access_token: &str) -> ApiResult<UserProfile> {
        let response = self
            .http
            .get(
                &self.config.url(CURRENT_USER_ENDPOINT),
                json_headers(Some(access_token)),
            )
            .await?;
        decode(response)
    }

    /// Register a new user. Errors propagate unchanged so calling UI can
    /// render field-level feedback.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Value> {
        let response = self
            .http
            .post(
                &self.config.url(REGISTER_ENDPOINT),
                json_headers(None),
                Some(serde_json::to_string(request).map_err(decode_err)?),
            )
            .await?;
        decode(response)
    }

    /// Request a password-reset email.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<Value> {
        let response = self
            .http
            .post(
                &self.config.url(PASSWORD_RESET_REQUEST_ENDPOINT),
                json_headers(None),
                Some(json!({ "email": email }).to_string()),
            )
            .await?;
        decode(response)
    }

    /// Check whether a password-reset token is still valid. The token
    /// travels as a query parameter, so it is percent-encoded.
    pub async fn verify_reset_token(&self, token: &str) -> ApiResult<Value> {
        let url = format!(
            "{}?token={}",
            self.config.url(PASSWORD_RESET_VERIFY_ENDPOINT),
            urlencoding::encode(token)
        );
        let response = self.http.get(&url, json_headers(None)).await?;
        decode(response)
    }

    /// Confirm a password reset with the verified token.
    pub async fn reset_password(&self, request: &ResetPasswordConfirm) -> ApiResult<Value> {
        let response = self
            .http
            .post(
                &self.config.url(PASSWORD_RESET_ENDPOINT),
                json_headers(None),
                Some(serde_json::to_string(request).map_err(decode_err)?),
            )
            .await?;
        decode(response)
    }
}

/// Headers shared by every auth call; bearer credential attached when given.
fn json_headers(access_token: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    if let Some(token) = access_token {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }
    headers
}

fn decode<T: serde::de::DeserializeOwned>(response: HttpResponse) -> ApiResult<T> {
    if !response.is_success() {
        return Err(ApiError::from_response(response.status(), response.body()));
    }
    response.json()
}

fn expect_success(response: HttpResponse) -> ApiResult<()> {
    if !response.is_success() {
        return Err(ApiError::from_response(response.status(), response.body()));
    }
    Ok(())
}

fn decode_err(e: serde_json::Error) -> ApiError {
    ApiError::Decode {
        reason: e.to_string(),
    }
}
