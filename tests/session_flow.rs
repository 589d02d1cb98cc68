//! End-to-end session lifecycle tests against a mock HTTP server,
//! exercising the real reqwest transport through the interceptor.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockito::Matcher;

use sentinel_client::guard::{evaluate_route, GuardDecision, RouteMeta};
use sentinel_client::nav::{NavTarget, Navigator};
use sentinel_client::session::storage::{MemoryStorage, SessionStorage};
use sentinel_client::session::types::{LoginCredentials, SessionPatch};
use sentinel_client::{ApiConfig, SessionContext};

struct RecordingNavigator {
    targets: Mutex<Vec<NavTarget>>,
}

impl RecordingNavigator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            targets: Mutex::new(Vec::new()),
        })
    }

    fn targets(&self) -> Vec<NavTarget> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, target: NavTarget) {
        self.targets.lock().unwrap().push(target);
    }
}

struct Env {
    server: mockito::ServerGuard,
    context: SessionContext,
    storage: Arc<MemoryStorage>,
    navigator: Arc<RecordingNavigator>,
}

async fn env() -> Env {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init()
        .ok();

    let server = mockito::Server::new_async().await;
    let storage = Arc::new(MemoryStorage::new());
    let navigator = RecordingNavigator::new();
    let config = ApiConfig::new(server.url());
    let http: Arc<dyn sentinel_client::HttpClient> = Arc::new(
        sentinel_client::ReqwestHttpClient::new(config.timeout).unwrap(),
    );
    let context = SessionContext::new(
        config,
        http,
        storage.clone() as Arc<dyn SessionStorage>,
        navigator.clone(),
    );

    Env {
        server,
        context,
        storage,
        navigator,
    }
}

fn profile_body(permissions: &[&str]) -> String {
    serde_json::json!({
        "id": "u-1",
        "username": "analyst",
        "email": "a@b.com",
        "nom_prenom": "Analyst One",
        "role": "r-1",
        "role_name": "Analyst",
        "is_active": true,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
        "permissions": permissions
    })
    .to_string()
}

fn seed_session(env: &Env, access: &str, refresh: &str) {
    env.context.manager.store().apply(SessionPatch {
        access_token: Some(access.to_string()),
        refresh_token: Some(refresh.to_string()),
        ..Default::default()
    });
}

#[tokio::test]
async fn login_flow_populates_session_over_http() {
    let mut env = env().await;

    let login = env
        .server
        .mock("POST", "/users/auth/login/")
        .match_body(Matcher::PartialJsonString(
            r#"{"email":"a@b.com","password":"x"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A1","refresh":"R1","permissions":["x"]}"#)
        .create_async()
        .await;

    let me = env
        .server
        .mock("GET", "/users/me/")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_body(&["x"]))
        .create_async()
        .await;

    let ok = env
        .context
        .manager
        .login(&LoginCredentials {
            email: "a@b.com".to_string(),
            password: "x".to_string(),
        })
        .await;

    assert!(ok);
    assert!(env.context.manager.is_authenticated());
    assert!(env.context.manager.has_permission("x"));
    // All four keys persisted together.
    let mut keys = env.storage.keys();
    keys.sort();
    assert_eq!(keys, vec!["access_token", "permissions", "refresh_token", "user"]);

    login.assert_async().await;
    me.assert_async().await;
}

#[tokio::test]
async fn expired_access_token_is_renewed_and_request_replayed() {
    let mut env = env().await;
    seed_session(&env, "A1", "R1");

    // The stale token is rejected once; the renewed token succeeds.
    let stale = env
        .server
        .mock("GET", "/entities/")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Token expired"}"#)
        .create_async()
        .await;

    let refresh = env
        .server
        .mock("POST", "/users/auth/refresh-token/")
        .match_body(Matcher::PartialJsonString(r#"{"refresh":"R1"}"#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A2"}"#)
        .create_async()
        .await;

    let replayed = env
        .server
        .mock("GET", "/entities/")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1}]"#)
        .create_async()
        .await;

    let response = env.context.client.get("/entities/").await.unwrap();
    assert_eq!(response.status(), 200);

    // The omitted refresh field keeps the prior refresh token.
    let store = env.context.manager.store();
    assert_eq!(store.access_token().as_deref(), Some("A2"));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));

    stale.assert_async().await;
    refresh.assert_async().await;
    replayed.assert_async().await;
}

#[tokio::test]
async fn rejected_refresh_token_collapses_session_and_redirects() {
    let mut env = env().await;
    seed_session(&env, "A1", "R1");

    let resource = env
        .server
        .mock("GET", "/entities/")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Token expired"}"#)
        .create_async()
        .await;

    let refresh = env
        .server
        .mock("POST", "/users/auth/refresh-token/")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Refresh token expired"}"#)
        .create_async()
        .await;

    let err = env.context.client.get("/entities/").await.unwrap_err();
    assert!(err.is_unauthorized());

    // Session is gone: all four keys removed, redirect to login requested.
    assert!(env.storage.keys().is_empty());
    assert!(!env.context.manager.is_authenticated());
    assert_eq!(
        env.navigator.targets(),
        vec![NavTarget::Login { redirect: None }]
    );
    assert_eq!(
        NavTarget::Login { redirect: None }.to_path(),
        "/authentication/login"
    );

    resource.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn route_guard_forbids_navigation_without_required_permission() {
    let mut env = env().await;
    seed_session(&env, "A1", "R1");

    // check_auth succeeds but the profile only grants entities_view.
    let me = env
        .server
        .mock("GET", "/users/me/")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_body(&["entities_view"]))
        .create_async()
        .await;

    let meta = RouteMeta::requires_auth().with_permissions(&["roles_view"]);
    let decision = evaluate_route(&env.context.manager, "/roles", &meta).await;

    assert_eq!(decision, GuardDecision::Redirect(NavTarget::Forbidden));
    me.assert_async().await;
}

#[tokio::test]
async fn route_guard_preserves_requested_path_for_login_redirect() {
    let env = env().await;
    // No session at all: check_auth fails before any network call.

    let meta = RouteMeta::requires_auth();
    let decision = evaluate_route(&env.context.manager, "/entities/42", &meta).await;

    assert_eq!(
        decision,
        GuardDecision::Redirect(NavTarget::Login {
            redirect: Some("/entities/42".to_string()),
        })
    );
}

#[tokio::test]
async fn guest_route_bounces_authenticated_session_to_dashboard() {
    let mut env = env().await;
    seed_session(&env, "A1", "R1");

    let me = env
        .server
        .mock("GET", "/users/me/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(profile_body(&[]))
        .create_async()
        .await;

    // Authenticate fully so `user` is populated.
    assert!(env.context.manager.check_auth().await);

    let decision =
        evaluate_route(&env.context.manager, "/authentication/login", &RouteMeta::guest()).await;
    assert_eq!(decision, GuardDecision::Redirect(NavTarget::Dashboard));

    me.assert_async().await;
}

#[tokio::test]
async fn logout_route_clears_session_and_redirects() {
    let mut env = env().await;
    seed_session(&env, "A1", "R1");

    let logout = env
        .server
        .mock("POST", "/users/auth/logout/")
        .match_body(Matcher::PartialJsonString(r#"{"refresh":"R1"}"#.to_string()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let decision = evaluate_route(
        &env.context.manager,
        "/authentication/logout",
        &RouteMeta::default(),
    )
    .await;

    assert_eq!(
        decision,
        GuardDecision::Redirect(NavTarget::Login { redirect: None })
    );
    assert!(env.storage.keys().is_empty());
    assert_eq!(
        env.navigator.targets(),
        vec![NavTarget::Login { redirect: None }]
    );

    logout.assert_async().await;
}
