use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials presented to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Successful login response: both tokens plus the granted permission codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Successful refresh response.
///
/// The server always returns a new access token but may omit the refresh
/// token and the permission list; omitted fields keep their current values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// Payload for registering a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub nom_prenom: String,
}

/// Payload confirming a password reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordConfirm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// The authenticated user's profile as served by `/users/me/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub nom_prenom: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Capability codes granted through the user's role.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// The session entity: the only state in this crate with a real lifecycle.
///
/// Authenticated means access token AND user are both present; neither
/// alone is sufficient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub permissions: HashSet<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }
}

/// Partial update applied to the session.
///
/// `None` fields are left untouched; a field is only ever nulled out by a
/// full `clear`, never by a patch.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub permissions: Option<Vec<String>>,
}

/// Observable authentication lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    /// No access token is held.
    Unauthenticated,
    /// An access token and user profile are held.
    Authenticated,
    /// A token refresh is in flight.
    Refreshing,
}
