// ABOUTME: End-to-end tests for the authenticated panel router
// ABOUTME: Drives login, the access gate, post-login redirects, logout, and builder validation through oneshot requests

#![cfg(feature = "auth")]

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Method, Request, StatusCode,
    },
    response::Response,
    Router,
};
use panel_mount::{
    action,
    auth::{AdminAccount, PasswordAuthenticator, PrunedMemoryStore, DEFAULT_COOKIE_NAME},
    ActionOutput, ActionResult, AssetDescriptor, AuthOptions, AuthenticatedRouter, Authenticator,
    CurrentAdmin, MountError, PanelPaths, StaticPanel,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef-test-secret";
const EMAIL: &str = "admin@example.com";
const PASSWORD: &str = "correct-horse";

// =============================================================================
// Helpers
// =============================================================================

struct FixedAuthenticator;

#[async_trait::async_trait]
impl Authenticator for FixedAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> anyhow::Result<Option<CurrentAdmin>> {
        if email == EMAIL && password == PASSWORD {
            Ok(Some(CurrentAdmin::new(EMAIL).with_title("Owner")))
        } else {
            Ok(None)
        }
    }
}

struct BrokenAuthenticator;

#[async_trait::async_trait]
impl Authenticator for BrokenAuthenticator {
    async fn authenticate(&self, _email: &str, _password: &str) -> anyhow::Result<Option<CurrentAdmin>> {
        anyhow::bail!("directory service unreachable")
    }
}

fn panel(assets_dir: &Path) -> StaticPanel {
    let whoami = || {
        action(|ctx, _| async move {
            ActionResult::Ok(ActionOutput::Json(json!({
                "admin": ctx.current_admin.map(|a| a.email),
            })))
        })
    };

    StaticPanel::new(PanelPaths::under("/admin"))
        .route(Method::GET, "/", "DashboardController", "index", whoami())
        .route(
            Method::GET,
            "/records/{recordId}",
            "RecordController",
            "show",
            whoami(),
        )
        .asset(AssetDescriptor::new(
            "/frontend/assets/app.css",
            assets_dir.join("app.css"),
        ))
}

fn options(authenticator: Arc<dyn Authenticator>) -> AuthOptions {
    AuthOptions::new(authenticator, SECRET)
}

/// Mount the authenticated router under its root, the way a host app would
fn app_with(authenticator: Arc<dyn Authenticator>, assets_dir: &Path) -> Router {
    let router = AuthenticatedRouter::new(Arc::new(panel(assets_dir)), options(authenticator))
        .memory_store()
        .build(None)
        .expect("router should build");
    Router::new().nest("/admin", router)
}

fn app(assets_dir: &Path) -> Router {
    app_with(Arc::new(FixedAuthenticator), assets_dir)
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_login(app: &Router, email: &str, password: &str, cookie: Option<&str>) -> Response {
    post_login_to(app, "/admin/login", email, password, cookie).await
}

async fn post_login_to(
    app: &Router,
    login_url: &str,
    email: &str,
    password: &str,
    cookie: Option<&str>,
) -> Response {
    let form = format!(
        "email={}&password={}",
        email.replace('@', "%40"),
        password
    );
    let mut request = Request::post(login_url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::from(form)).unwrap())
        .await
        .unwrap()
}

/// `name=value` pair of the session cookie set by a response
fn session_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn location(response: &Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router) -> String {
    let response = post_login(app, EMAIL, PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response, DEFAULT_COOKIE_NAME).expect("login should set the session cookie")
}

// =============================================================================
// Gate
// =============================================================================

#[tokio::test]
async fn test_unauthenticated_request_redirects_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = get(&app, "/admin", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let response = get(&app, "/admin/records/1", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login?next=%2Fadmin%2Frecords%2F1");
    assert!(session_cookie(&response, DEFAULT_COOKIE_NAME).is_none());
}

#[tokio::test]
async fn test_unmatched_path_redirects_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = get(&app, "/admin/x0", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login?next=%2Fadmin%2Fx0");

    let cookie = login(&app).await;
    let response = get(&app, "/admin/x0", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_get_requests_do_not_carry_next() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = app
        .clone()
        .oneshot(Request::post("/admin/records/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
}

#[tokio::test]
async fn test_anonymous_traffic_does_not_grow_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = PrunedMemoryStore::new();
    let router = AuthenticatedRouter::new(
        Arc::new(panel(dir.path())),
        options(Arc::new(FixedAuthenticator)),
    )
    .session_store(store.clone())
    .build(None)
    .unwrap();
    let app = Router::new().nest("/admin", router);

    for i in 0..100 {
        let response = get(&app, &format!("/admin?i={i}"), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    assert_eq!(store.len().await, 0);

    login(&app).await;
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_login_page_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = get(&app, "/admin/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"action="/admin/login""#));
    assert!(!html.contains("login-error"));
}

#[tokio::test]
async fn test_assets_are_public() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.css"), "body { margin: 0; }").unwrap();
    let app = app(dir.path());

    let response = get(&app, "/admin/frontend/assets/app.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "body { margin: 0; }");
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_wrong_credentials_rerender_login_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = post_login(&app, EMAIL, "wrong", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response, DEFAULT_COOKIE_NAME).is_none());
    let html = body_text(response).await;
    assert!(html.contains("Invalid credentials"));
    assert!(html.contains(r#"action="/admin/login""#));
}

#[tokio::test]
async fn test_missing_fields_rerender_login_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = app
        .clone()
        .oneshot(
            Request::post("/admin/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=admin%40example.com"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid credentials"));
}

#[tokio::test]
async fn test_successful_login_redirects_to_root_and_opens_panel() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = post_login(&app, EMAIL, PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
    let cookie = session_cookie(&response, DEFAULT_COOKIE_NAME).unwrap();

    let response = get(&app, "/admin/records/3", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "admin": EMAIL }));
}

#[tokio::test]
async fn test_login_returns_to_originally_requested_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = get(&app, "/admin/records/5?tab=history", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let login_url = location(&response).to_string();
    assert_eq!(login_url, "/admin/login?next=%2Fadmin%2Frecords%2F5%3Ftab%3Dhistory");

    // The form posts back with the return target kept
    let html = body_text(get(&app, &login_url, None).await).await;
    assert!(html.contains(&format!(r#"action="{login_url}""#)));

    let response = post_login_to(&app, &login_url, EMAIL, "wrong", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&format!(r#"action="{login_url}""#)));

    let response = post_login_to(&app, &login_url, EMAIL, PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/records/5?tab=history");

    let cookie = session_cookie(&response, DEFAULT_COOKIE_NAME).unwrap();
    let response = get(&app, "/admin/records/5", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_foreign_next_target_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = post_login_to(
        &app,
        "/admin/login?next=%2F%2Fevil.example.com",
        EMAIL,
        PASSWORD,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
}

#[tokio::test]
async fn test_session_id_changes_on_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let first = login(&app).await;

    let response = post_login(&app, EMAIL, PASSWORD, Some(&first)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let second = session_cookie(&response, DEFAULT_COOKIE_NAME).unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_authenticator_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(Arc::new(BrokenAuthenticator), dir.path());

    let response = post_login(&app, EMAIL, PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_password_authenticator_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let account = AdminAccount::create(EMAIL, PASSWORD).unwrap();
    let app = app_with(Arc::new(PasswordAuthenticator::new(vec![account])), dir.path());

    let response = post_login(&app, "ADMIN@example.com", PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = post_login(&app, EMAIL, "nope", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_ends_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let cookie = login(&app).await;

    let response = get(&app, "/admin/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let response = get(&app, "/admin/records/1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/admin/login"));
}

#[tokio::test]
async fn test_anonymous_logout_is_not_a_return_target() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = get(&app, "/admin/logout", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let response = post_login_to(&app, location(&response), EMAIL, PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
}

// =============================================================================
// Cookie and store options
// =============================================================================

#[tokio::test]
async fn test_session_cookie_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let response = post_login(&app, EMAIL, PASSWORD, None).await;
    let header = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(DEFAULT_COOKIE_NAME))
        .unwrap()
        .to_string();
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Secure"));
    assert!(header.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_custom_cookie_name_and_injected_store() {
    let dir = tempfile::tempdir().unwrap();
    let router = AuthenticatedRouter::new(
        Arc::new(panel(dir.path())),
        options(Arc::new(FixedAuthenticator)).with_cookie_name("acme_admin"),
    )
    .session_store(tower_sessions::MemoryStore::default())
    .secure_cookie(false)
    .build(None)
    .unwrap();
    let app = Router::new().nest("/admin", router);

    let response = post_login(&app, EMAIL, PASSWORD, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&response, DEFAULT_COOKIE_NAME).is_none());
    let cookie = session_cookie(&response, "acme_admin").unwrap();

    let response = get(&app, "/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forged_cookie_is_not_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    let cookie = login(&app).await;

    let forged = format!("{cookie}x");
    let response = get(&app, "/admin/records/1", Some(&forged)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

// =============================================================================
// Builder validation
// =============================================================================

#[test]
fn test_missing_session_store_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AuthenticatedRouter::new(
        Arc::new(panel(dir.path())),
        options(Arc::new(FixedAuthenticator)),
    )
    .build(None);
    assert!(matches!(result, Err(MountError::Configuration(_))));
}

#[tokio::test]
async fn test_short_cookie_secret_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AuthenticatedRouter::new(
        Arc::new(panel(dir.path())),
        AuthOptions::new(Arc::new(FixedAuthenticator), "short"),
    )
    .memory_store()
    .build(None);
    assert!(matches!(result, Err(MountError::Configuration(_))));
}

#[tokio::test]
async fn test_route_clashing_with_login_is_invalid_argument() {
    let dir = tempfile::tempdir().unwrap();
    let panel = panel(dir.path()).route(
        Method::POST,
        "/login",
        "SessionController",
        "create",
        action(|_, _| async { ActionResult::Ok(ActionOutput::Empty) }),
    );
    let result = AuthenticatedRouter::new(Arc::new(panel), options(Arc::new(FixedAuthenticator)))
        .memory_store()
        .build(None);
    assert!(matches!(result, Err(MountError::InvalidArgument(_))));
}
