use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::session::storage::{
    SessionStorage, ACCESS_TOKEN_KEY, PERMISSIONS_KEY, REFRESH_TOKEN_KEY, USER_KEY,
};
use crate::session::types::{Session, SessionPatch, UserProfile};

/// Single source of truth for the session entity.
///
/// Every mutation is mirrored to durable storage so a process restart
/// reconstructs the session without a new login. Reads are synchronous;
/// the lock is never held across an await point.
pub struct SessionStore {
    session: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Build a store whose initial state is loaded from storage.
    ///
    /// Absent keys yield defaults and a corrupt value is treated as absent;
    /// loading never fails.
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let access_token = storage.get(ACCESS_TOKEN_KEY);
        let refresh_token = storage.get(REFRESH_TOKEN_KEY);

        let user = storage.get(USER_KEY).and_then(|raw| {
            match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Persisted user profile is corrupt, ignoring");
                    None
                }
            }
        });

        let permissions = storage
            .get(PERMISSIONS_KEY)
            .and_then(|raw| match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(permissions) => Some(permissions),
                Err(e) => {
                    warn!(error = %e, "Persisted permissions are corrupt, ignoring");
                    None
                }
            })
            .unwrap_or_default()
            .into_iter()
            .collect::<HashSet<String>>();

        let session = Session {
            access_token,
            refresh_token,
            user,
            permissions,
        };

        debug!(
            authenticated = session.is_authenticated(),
            permissions = session.permissions.len(),
            "Session store loaded"
        );

        Self {
            session: RwLock::new(session),
            storage,
        }
    }

    /// Apply a partial update, persisting each included field.
    ///
    /// Fields not included in the patch keep their current values; a patch
    /// can never null anything out.
    pub fn apply(&self, patch: SessionPatch) {
        let mut session = self.session.write().unwrap();

        if let Some(access_token) = patch.access_token {
            self.storage.set(ACCESS_TOKEN_KEY, &access_token);
            session.access_token = Some(access_token);
        }

        if let Some(refresh_token) = patch.refresh_token {
            self.storage.set(REFRESH_TOKEN_KEY, &refresh_token);
            session.refresh_token = Some(refresh_token);
        }

        if let Some(user) = patch.user {
            match serde_json::to_string(&user) {
                Ok(raw) => self.storage.set(USER_KEY, &raw),
                Err(e) => warn!(error = %e, "Failed to serialize user profile for storage"),
            }
            session.user = Some(user);
        }

        if let Some(permissions) = patch.permissions {
            match serde_json::to_string(&permissions) {
                Ok(raw) => self.storage.set(PERMISSIONS_KEY, &raw),
                Err(e) => warn!(error = %e, "Failed to serialize permissions for storage"),
            }
            // Replaced wholesale, never merged.
            session.permissions = permissions.into_iter().collect();
        }
    }

    /// Remove all persisted keys and reset in-memory state. Idempotent.
    pub fn clear(&self) {
        let mut session = self.session.write().unwrap();
        self.storage.remove(ACCESS_TOKEN_KEY);
        self.storage.remove(REFRESH_TOKEN_KEY);
        self.storage.remove(USER_KEY);
        self.storage.remove(PERMISSIONS_KEY);
        *session = Session::default();
        debug!("Session cleared");
    }

    pub fn access_token(&self) -> Option<String> {
        self.session.read().unwrap().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.session.read().unwrap().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.session.read().unwrap().user.clone()
    }

    /// Snapshot of the full session entity.
    pub fn snapshot(&self) -> Session {
        self.session.read().unwrap().clone()
    }

    /// True iff both access token and user are present.
    pub fn is_authenticated(&self) -> bool {
        self.session.read().unwrap().is_authenticated()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.session.read().unwrap().permissions.contains(permission)
    }

    pub fn has_any_permission(&self, permissions: &[String]) -> bool {
        let session = self.session.read().unwrap();
        permissions.iter().any(|p| session.permissions.contains(p))
    }

    pub fn has_all_permissions(&self, permissions: &[String]) -> bool {
        let session = self.session.read().unwrap();
        permissions.iter().all(|p| session.permissions.contains(p))
    }
}
