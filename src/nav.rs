use async_trait::async_trait;
use tracing::info;

/// Login page route.
pub const LOGIN_ROUTE: &str = "/authentication/login";
/// Logout route; navigating here tears the session down.
pub const LOGOUT_ROUTE: &str = "/authentication/logout";
/// Default landing page for an authenticated session.
pub const DASHBOARD_ROUTE: &str = "/dashboard";
/// Page shown when a required permission is missing.
pub const FORBIDDEN_ROUTE: &str = "/forbidden";

/// Where the session layer wants the host to navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    /// The login page. `redirect` preserves the originally requested path
    /// so the user can be returned there after re-authenticating.
    Login { redirect: Option<String> },
    /// The default authenticated landing page.
    Dashboard,
    /// The forbidden page.
    Forbidden,
}

impl NavTarget {
    /// Render the target as a path. The redirect travels as a query
    /// parameter and is percent-encoded so paths carrying their own query
    /// string survive the round trip.
    pub fn to_path(&self) -> String {
        match self {
            NavTarget::Login { redirect: None } => LOGIN_ROUTE.to_string(),
            NavTarget::Login {
                redirect: Some(path),
            } => format!("{LOGIN_ROUTE}?redirect={}", urlencoding::encode(path)),
            NavTarget::Dashboard => DASHBOARD_ROUTE.to_string(),
            NavTarget::Forbidden => FORBIDDEN_ROUTE.to_string(),
        }
    }
}

/// Seam between the session layer and the host's navigation machinery.
///
/// The session manager and interceptor decide *where* to go on session
/// collapse; the host decides *how* (router push, window change, CLI exit).
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, target: NavTarget);
}

/// Navigator that only records the decision in the log stream. Suitable
/// for headless hosts that poll session state instead.
#[derive(Default)]
pub struct LoggingNavigator;

#[async_trait]
impl Navigator for LoggingNavigator {
    async fn navigate(&self, target: NavTarget) {
        info!(path = %target.to_path(), "Navigation requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_target_preserves_redirect_path() {
        let target = NavTarget::Login {
            redirect: Some("/entities/42".to_string()),
        };
        assert_eq!(
            target.to_path(),
            "/authentication/login?redirect=%2Fentities%2F42"
        );

        let plain = NavTarget::Login { redirect: None };
        assert_eq!(plain.to_path(), "/authentication/login");
    }

    #[test]
    fn login_redirect_encodes_embedded_query_string() {
        // A redirect that itself carries a query string must not bleed
        // extra parameters into the login URL.
        let target = NavTarget::Login {
            redirect: Some("/entities?tab=a&page=2".to_string()),
        };
        assert_eq!(
            target.to_path(),
            "/authentication/login?redirect=%2Fentities%3Ftab%3Da%26page%3D2"
        );
        assert_eq!(
            urlencoding::decode("%2Fentities%3Ftab%3Da%26page%3D2").unwrap(),
            "/entities?tab=a&page=2"
        );
    }
}
