use std::collections::HashSet;

use tracing::debug;

use crate::nav::{NavTarget, LOGOUT_ROUTE};
use crate::session::manager::SessionManager;

/// Navigation metadata declared per route.
#[derive(Debug, Clone, Default)]
pub struct RouteMeta {
    /// The route requires an authenticated session.
    pub requires_auth: bool,
    /// The route is only for unauthenticated visitors (login, register).
    pub guest: bool,
    /// Permission codes the session must all hold to enter.
    pub permissions: Vec<String>,
}

impl RouteMeta {
    pub fn requires_auth() -> Self {
        Self {
            requires_auth: true,
            ..Default::default()
        }
    }

    pub fn guest() -> Self {
        Self {
            guest: true,
            ..Default::default()
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Outcome of evaluating a navigation against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed to the requested route.
    Allow,
    /// Go somewhere else instead.
    Redirect(NavTarget),
}

/// Gate a navigation to `to_path` with metadata `meta`.
///
/// Rules, evaluated in order: the logout route tears the session down;
/// auth-requiring routes demand a successful `check_auth`, preserving the
/// requested path as the login redirect target; guest-only routes bounce
/// authenticated sessions to the dashboard; routes declaring permissions
/// require all of them.
pub async fn evaluate_route(
    session: &SessionManager,
    to_path: &str,
    meta: &RouteMeta,
) -> GuardDecision {
    if to_path == LOGOUT_ROUTE {
        session.logout().await;
        return GuardDecision::Redirect(NavTarget::Login { redirect: None });
    }

    if meta.requires_auth && !session.check_auth().await {
        debug!(path = to_path, "Navigation blocked, authentication required");
        return GuardDecision::Redirect(NavTarget::Login {
            redirect: Some(to_path.to_string()),
        });
    }

    if meta.guest && session.is_authenticated() {
        return GuardDecision::Redirect(NavTarget::Dashboard);
    }

    if !meta.permissions.is_empty() && !session.has_all_permissions(&meta.permissions) {
        debug!(path = to_path, "Navigation blocked, permission missing");
        return GuardDecision::Redirect(NavTarget::Forbidden);
    }

    GuardDecision::Allow
}

/// Matching mode for permission-gated rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// At least one of the required codes must be granted.
    Any,
    /// Every required code must be granted.
    All,
}

/// Whether an element gated on `required` should be rendered for a
/// session holding `granted`.
///
/// Pure and host-framework-agnostic: the view layer feeds the result to
/// its own conditional-rendering primitive. An empty requirement is
/// always visible.
pub fn visible(granted: &HashSet<String>, required: &[String], mode: MatchMode) -> bool {
    if required.is_empty() {
        return true;
    }
    match mode {
        MatchMode::Any => required.iter().any(|p| granted.contains(p)),
        MatchMode::All => required.iter().all(|p| granted.contains(p)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(codes: &[&str]) -> HashSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn required(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn visible_any_mode_needs_one_match() {
        let granted = granted(&["entities_view"]);
        assert!(visible(
            &granted,
            &required(&["entities_view", "entities_edit"]),
            MatchMode::Any
        ));
        assert!(!visible(
            &granted,
            &required(&["roles_view"]),
            MatchMode::Any
        ));
    }

    #[test]
    fn visible_all_mode_needs_every_match() {
        let granted = granted(&["entities_view", "entities_edit"]);
        assert!(visible(
            &granted,
            &required(&["entities_view", "entities_edit"]),
            MatchMode::All
        ));
        assert!(!visible(
            &granted,
            &required(&["entities_view", "entities_delete"]),
            MatchMode::All
        ));
    }

    #[test]
    fn empty_requirement_is_always_visible() {
        assert!(visible(&granted(&[]), &[], MatchMode::Any));
        assert!(visible(&granted(&[]), &[], MatchMode::All));
    }
}
