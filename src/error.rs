use serde_json::Value;
use thiserror::Error;

/// Result alias used across the crate boundary.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error taxonomy for everything that crosses the API boundary.
///
/// The split matters for recovery: only `Unauthorized` responses feed the
/// refresh-and-replay protocol. A `Network` failure means no response was
/// received and must never trigger a refresh.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response received: timeout, DNS failure, connection reset.
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// The server answered and judged the presented credential
    /// missing, invalid or expired.
    #[error("Authorization failed: {message}")]
    Unauthorized { message: String },

    /// Any other non-success response that carried a body.
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response arrived but its body did not match the expected shape.
    #[error("Failed to decode response body: {reason}")]
    Decode { reason: String },
}

impl ApiError {
    /// Classify a received response by status code, extracting a
    /// human-readable message from the body when one is present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message =
            extract_message(body).unwrap_or_else(|| generic_message_for(status).to_string());

        if status == 401 {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Api { status, message }
        }
    }

    /// True only for authorization failures, the one category that may
    /// enter the refresh/retry path.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The user-facing message carried by this error.
    pub fn message(&self) -> String {
        match self {
            ApiError::Network { reason } => reason.clone(),
            ApiError::Unauthorized { message } => message.clone(),
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Decode { reason } => reason.clone(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network {
            reason: err.to_string(),
        }
    }
}

/// Pull a human-readable message out of a JSON error body.
///
/// The platform reports failures under an `error` key; `detail` and
/// `message` cover the framework-level responses.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["error", "detail", "message"] {
        if let Some(message) = value.get(key).and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }
    None
}

fn generic_message_for(status: u16) -> &'static str {
    match status {
        401 => "Authentication credentials were not provided or are invalid",
        403 => "You do not have permission to perform this action",
        404 => "The requested resource was not found",
        500..=599 => "The server encountered an error processing the request",
        _ => "The request could not be completed",
    }
}
