use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A response that only holds the data the interceptor layer needs.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    status_code: u16,
    /// Response body
    body: String,
}

impl HttpResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: status,
            body: body.into(),
        }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Get a reference to the response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode {
            reason: e.to_string(),
        })
    }

    /// Check if successful (2xx status)
    pub fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Trait for HTTP transport operations, allowing for mocking.
///
/// Implementations return `Err` only when no response was received at all;
/// a received response is always `Ok`, whatever its status.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> ApiResult<HttpResponse>;

    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<String>,
    ) -> ApiResult<HttpResponse>;

    async fn put(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<String>,
    ) -> ApiResult<HttpResponse>;

    async fn delete(&self, url: &str, headers: HashMap<String, String>)
        -> ApiResult<HttpResponse>;
}

/// Implementation of HttpClient using reqwest
pub struct ReqwestHttpClient {
    /// Internal reqwest client
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new client with the given per-request timeout.
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Create a new client from an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ApiResult<HttpResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse::new(status, body))
    }

    fn apply_headers(
        mut request: reqwest::RequestBuilder,
        headers: HashMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (key, value) in headers {
            request = request.header(key, value);
        }
        request
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> ApiResult<HttpResponse> {
        let request = Self::apply_headers(self.client.get(url), headers);
        self.send(request).await
    }

    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<String>,
    ) -> ApiResult<HttpResponse> {
        let mut request = Self::apply_headers(self.client.post(url), headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        self.send(request).await
    }

    async fn put(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<String>,
    ) -> ApiResult<HttpResponse> {
        let mut request = Self::apply_headers(self.client.put(url), headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        self.send(request).await
    }

    async fn delete(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> ApiResult<HttpResponse> {
        let request = Self::apply_headers(self.client.delete(url), headers);
        self.send(request).await
    }
}
