use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::client::{HttpClient, HttpMethod, HttpResponse};

/// Path fragment identifying the refresh endpoint. Requests to it pass
/// through without a bearer header and are never themselves retried.
const REFRESH_PATH_FRAGMENT: &str = "/refresh-token";

/// What the interceptor needs from the session layer.
///
/// The session manager implements this; the indirection keeps the
/// interceptor testable with a stub session and avoids a module cycle.
#[async_trait]
pub trait SessionAccess: Send + Sync {
    /// Current access token, if any.
    fn access_token(&self) -> Option<String>;

    /// Run one refresh cycle. True when a new access token is in place.
    async fn refresh(&self) -> bool;

    /// Hard session failure: clear all session state and redirect to login.
    async fn collapse(&self);
}

/// One logical request plus its retry bookkeeping.
///
/// The attempt counter lives here, on a value owned by the interceptor,
/// rather than as a marker smuggled onto a shared request object.
#[derive(Debug)]
pub struct RequestAttempt {
    id: Uuid,
    method: HttpMethod,
    path: String,
    body: Option<Value>,
    attempts: u32,
}

impl RequestAttempt {
    fn new(method: HttpMethod, path: &str, body: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.to_string(),
            body,
            attempts: 0,
        }
    }

    /// True once the request has been through one recovery cycle.
    pub fn already_retried(&self) -> bool {
        self.attempts > 0
    }

    fn mark_retried(&mut self) {
        self.attempts += 1;
    }

    /// True when this request targets the refresh endpoint itself.
    pub fn is_refresh_request(&self) -> bool {
        self.path.contains(REFRESH_PATH_FRAGMENT)
    }
}

/// Cross-cutting wrapper applied to every outbound resource request.
///
/// Request phase: attach the bearer token, except to the refresh endpoint.
/// Response phase: on a 401 actually received from the server, run exactly
/// one refresh-and-replay cycle; network-level failures with no response
/// pass through untouched.
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    session: Arc<dyn SessionAccess>,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(http: Arc<dyn HttpClient>, session: Arc<dyn SessionAccess>, config: ApiConfig) -> Self {
        Self {
            http,
            session,
            config,
        }
    }

    pub async fn get(&self, path: &str) -> ApiResult<HttpResponse> {
        self.execute(RequestAttempt::new(HttpMethod::Get, path, None))
            .await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> ApiResult<HttpResponse> {
        self.execute(RequestAttempt::new(HttpMethod::Post, path, body))
            .await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> ApiResult<HttpResponse> {
        self.execute(RequestAttempt::new(HttpMethod::Put, path, body))
            .await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<HttpResponse> {
        self.execute(RequestAttempt::new(HttpMethod::Delete, path, None))
            .await
    }

    /// Convenience: GET and decode the body.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.get(path).await?.json()
    }

    async fn execute(&self, mut attempt: RequestAttempt) -> ApiResult<HttpResponse> {
        // A transport failure here has no response and bypasses recovery.
        let response = self.dispatch(&attempt).await?;

        if response.status() != 401 || attempt.already_retried() {
            return classify(response);
        }

        attempt.mark_retried();
        let original = ApiError::from_response(response.status(), response.body());

        if attempt.is_refresh_request() {
            // A 401 from the refresh endpoint is fatal to the session.
            warn!(
                request_id = %attempt.id,
                path = %attempt.path,
                "Refresh endpoint rejected the refresh token, forcing logout"
            );
            self.session.collapse().await;
            return Err(original);
        }

        debug!(
            request_id = %attempt.id,
            path = %attempt.path,
            "Received 401, attempting token refresh"
        );

        if self.session.refresh().await {
            // Replay once with the renewed token; a second 401 is
            // propagated as-is since the attempt is marked retried.
            let replay = self.dispatch(&attempt).await?;
            return classify(replay);
        }

        self.session.collapse().await;
        Err(original)
    }

    async fn dispatch(&self, attempt: &RequestAttempt) -> ApiResult<HttpResponse> {
        let url = self.config.url(&attempt.path);
        let headers = self.headers_for(attempt);
        let body = attempt.body.as_ref().map(Value::to_string);

        debug!(
            request_id = %attempt.id,
            method = attempt.method.as_str(),
            path = %attempt.path,
            attempt = attempt.attempts + 1,
            "Dispatching request"
        );

        match attempt.method {
            HttpMethod::Get => self.http.get(&url, headers).await,
            HttpMethod::Post => self.http.post(&url, headers, body).await,
            HttpMethod::Put => self.http.put(&url, headers, body).await,
            HttpMethod::Delete => self.http.delete(&url, headers).await,
        }
    }

    fn headers_for(&self, attempt: &RequestAttempt) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        // Never attach a possibly-stale access token to a refresh call.
        if !attempt.is_refresh_request() {
            if let Some(token) = self.session.access_token() {
                headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
        }

        headers
    }
}

fn classify(response: HttpResponse) -> ApiResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response.status(), response.body()))
    }
}
