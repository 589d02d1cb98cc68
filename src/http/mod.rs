pub mod client;
pub mod interceptor;

pub use client::{HttpClient, HttpMethod, HttpResponse, ReqwestHttpClient};
pub use interceptor::{ApiClient, RequestAttempt, SessionAccess};
