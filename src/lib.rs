//! Client library for the Sentinel security-monitoring platform API.
//!
//! The crate covers the session core: a token store mirrored to durable
//! storage, a session manager handling login/refresh/logout/check-auth,
//! a request interceptor that renews expired access tokens and replays
//! the failed request once, and a route guard gating navigation on
//! authentication and permission codes.

use std::path::Path;
use std::sync::Arc;

// Export modules
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod nav;
pub mod session;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use guard::{evaluate_route, visible, GuardDecision, MatchMode, RouteMeta};
pub use http::{ApiClient, HttpClient, ReqwestHttpClient, SessionAccess};
pub use nav::{NavTarget, Navigator};
pub use session::{
    AuthApi, AuthState, LoginCredentials, SessionManager, SessionStorage, SessionStore,
};

use session::storage::FileStorage;

/// Explicitly assembled session context.
///
/// Everything is dependency-injected: the transport, the storage backend
/// and the navigator all come in through the constructor, so hosts and
/// tests control every seam and no global mutable state exists.
pub struct SessionContext {
    /// The session manager, shared with the interceptor.
    pub manager: Arc<SessionManager>,
    /// The intercepted API client for resource calls.
    pub client: ApiClient,
}

impl SessionContext {
    /// Assemble a context from explicit collaborators.
    pub fn new(
        config: ApiConfig,
        http: Arc<dyn HttpClient>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let store = Arc::new(SessionStore::load(storage));
        let api = AuthApi::new(Arc::clone(&http), config.clone());
        let manager = Arc::new(SessionManager::new(api, store, navigator));
        let client = ApiClient::new(
            http,
            Arc::clone(&manager) as Arc<dyn SessionAccess>,
            config,
        );

        Self { manager, client }
    }

    /// Assemble a context over a real reqwest transport with file-backed
    /// session storage at `storage_path`.
    pub fn connect(
        config: ApiConfig,
        storage_path: impl AsRef<Path>,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(config.timeout)?);
        let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::open(storage_path.as_ref()));
        Ok(Self::new(config, http, storage, navigator))
    }
}
