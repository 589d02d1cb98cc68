use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::http::interceptor::SessionAccess;
use crate::nav::{NavTarget, Navigator};
use crate::session::service::AuthApi;
use crate::session::store::SessionStore;
use crate::session::types::{
    AuthState, LoginCredentials, RegisterRequest, ResetPasswordConfirm, SessionPatch, UserProfile,
};

/// Orchestrates the session lifecycle: login, logout, refresh-on-demand
/// and check-auth. The only component allowed to mutate the token store.
///
/// Explicitly constructed and passed to its collaborators; there is no
/// implicit process-wide instance.
pub struct SessionManager {
    api: AuthApi,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    /// Serializes refresh cycles: at most one exchange in flight.
    refresh_lock: Mutex<()>,
    refreshing: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl SessionManager {
    pub fn new(api: AuthApi, store: Arc<SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            store,
            navigator,
            refresh_lock: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    /// The token store this manager owns. Collaborators read it; only the
    /// manager writes tokens.
    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    /// Exchange credentials for a session.
    ///
    /// On success the tokens and permission codes are stored, then the
    /// full profile is fetched and stored. On failure the prior session is
    /// left untouched and a message is surfaced via [`last_error`].
    ///
    /// [`last_error`]: SessionManager::last_error
    pub async fn login(&self, credentials: &LoginCredentials) -> bool {
        self.set_error(None);

        let auth = match self.api.login(credentials).await {
            Ok(auth) => auth,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.set_error(Some(user_message(&e, "Error during login")));
                return false;
            }
        };

        self.store.apply(SessionPatch {
            access_token: Some(auth.access),
            refresh_token: Some(auth.refresh),
            permissions: Some(auth.permissions),
            user: None,
        });

        match self.fetch_current_user().await {
            Ok(user) => {
                info!(username = %user.username, "Login succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch after login failed");
                self.set_error(Some(user_message(&e, "Error during login")));
                false
            }
        }
    }

    /// Fetch the current user's profile and store it, replacing the
    /// permission set wholesale with the profile's codes.
    pub async fn fetch_current_user(&self) -> ApiResult<UserProfile> {
        let token = self.store.access_token().ok_or(ApiError::Unauthorized {
            message: "No access token held".to_string(),
        })?;

        let user = self.api.current_user(&token).await?;
        let permissions = user.permissions.clone().unwrap_or_default();
        self.store.apply(SessionPatch {
            user: Some(user.clone()),
            permissions: Some(permissions),
            ..Default::default()
        });
        Ok(user)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Returns false without any network call when no refresh token is
    /// held. The server may omit a new refresh token (the existing one is
    /// kept) or permissions (kept likewise). On exchange failure the whole
    /// session is cleared; the caller is responsible for any redirect.
    pub async fn refresh_access_token(&self) -> bool {
        if self.store.refresh_token().is_none() {
            debug!("No refresh token held, refresh is a no-op failure");
            return false;
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-read after acquiring the lock: a refresh that lost the race
        // to a session clear must fail fast without a network call.
        let Some(refresh_token) = self.store.refresh_token() else {
            return false;
        };

        self.refreshing.store(true, Ordering::SeqCst);
        let result = self.api.refresh(&refresh_token).await;
        self.refreshing.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.store.apply(SessionPatch {
                    access_token: Some(response.access),
                    refresh_token: response.refresh,
                    permissions: response.permissions,
                    user: None,
                });
                debug!("Access token refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.store.clear();
                false
            }
        }
    }

    /// Validate the session against the server.
    ///
    /// True when an access token is held and the profile fetch succeeds.
    /// A 401 on the profile fetch gets exactly one refresh attempt and
    /// exactly one retry of the fetch; any other failure returns false.
    pub async fn check_auth(&self) -> bool {
        if self.store.access_token().is_none() {
            return false;
        }

        match self.fetch_current_user().await {
            Ok(_) => true,
            Err(e) if e.is_unauthorized() => {
                debug!("Profile fetch rejected, attempting one refresh");
                if self.refresh_access_token().await {
                    self.fetch_current_user().await.is_ok()
                } else {
                    false
                }
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch failed");
                false
            }
        }
    }

    /// Tear the session down.
    ///
    /// Server-side invalidation of the refresh token is best-effort; the
    /// local clear and the redirect to login happen unconditionally and
    /// this call never fails.
    pub async fn logout(&self) {
        if self.store.access_token().is_some() {
            if let Some(refresh_token) = self.store.refresh_token() {
                if let Err(e) = self.api.logout(&refresh_token).await {
                    warn!(error = %e, "Server-side logout failed, clearing locally anyway");
                }
            }
        }

        self.store.clear();
        info!("Logged out");
        self.navigator
            .navigate(NavTarget::Login { redirect: None })
            .await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AuthState {
        if self.refreshing.load(Ordering::SeqCst) {
            AuthState::Refreshing
        } else if self.store.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.store.has_permission(permission)
    }

    pub fn has_any_permission(&self, permissions: &[String]) -> bool {
        self.store.has_any_permission(permissions)
    }

    pub fn has_all_permissions(&self, permissions: &[String]) -> bool {
        self.store.has_all_permissions(permissions)
    }

    /// The last user-facing error message, if the most recent operation
    /// failed.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().unwrap().clone()
    }

    /// Register a new user. Errors propagate upward unchanged for
    /// caller-specific handling.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Value> {
        self.set_error(None);
        self.api.register(request).await.map_err(|e| {
            self.set_error(Some(user_message(&e, "Error during registration")));
            e
        })
    }

    /// Request a password-reset email. Errors propagate upward unchanged.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<Value> {
        self.set_error(None);
        self.api.request_password_reset(email).await.map_err(|e| {
            self.set_error(Some(user_message(
                &e,
                "Error while requesting password reset",
            )));
            e
        })
    }

    /// Check a password-reset token. Errors propagate upward unchanged.
    pub async fn verify_reset_token(&self, token: &str) -> ApiResult<Value> {
        self.api.verify_reset_token(token).await.map_err(|e| {
            self.set_error(Some(user_message(&e, "Invalid reset token")));
            e
        })
    }

    /// Confirm a password reset. Errors propagate upward unchanged.
    pub async fn reset_password(&self, request: &ResetPasswordConfirm) -> ApiResult<Value> {
        self.set_error(None);
        self.api.reset_password(request).await.map_err(|e| {
            self.set_error(Some(user_message(&e, "Error resetting password")));
            e
        })
    }

    fn set_error(&self, message: Option<String>) {
        *self.last_error.write().unwrap() = message;
    }
}

#[async_trait]
impl SessionAccess for SessionManager {
    fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    async fn refresh(&self) -> bool {
        self.refresh_access_token().await
    }

    async fn collapse(&self) {
        self.store.clear();
        self.navigator
            .navigate(NavTarget::Login { redirect: None })
            .await;
    }
}

/// Message shown to the user for a failed operation: the body's message
/// for responses the server actually sent, the operation's fallback for
/// transport and decode failures.
fn user_message(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Unauthorized { .. } | ApiError::Api { .. } => error.message(),
        ApiError::Network { .. } | ApiError::Decode { .. } => fallback.to_string(),
    }
}
