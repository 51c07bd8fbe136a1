// ABOUTME: Authenticated router builder: session layer, login/logout routes, and the access gate
// ABOUTME: The session store is injected by the caller; building without one fails before any route is added

pub mod authenticator;
mod gate;
mod routes;
pub mod store;

use axum::{http::StatusCode, middleware, routing::get, Router};
use sha2::{Digest, Sha512};
use std::collections::HashSet;
use std::sync::Arc;
use tower_sessions::{
    cookie::{Key, SameSite},
    Expiry, SessionManagerLayer, SessionStore,
};

pub use authenticator::{hash_password, AdminAccount, Authenticator, PasswordAuthenticator};
pub use store::{PrunedMemoryStore, PRUNE_INTERVAL};

use crate::error::MountError;
use crate::panel::AdminPanel;
use crate::path::relative_to_root;
use crate::router::{register_routes, RouteTable};

/// Session key holding the logged-in principal
pub const ADMIN_USER_KEY: &str = "admin_user";

/// Login query parameter carrying the page requested before the redirect
pub const NEXT_PARAM: &str = "next";

/// Cookie name used when the options leave it unset
pub const DEFAULT_COOKIE_NAME: &str = "panel_session";

/// Session lifetime, refreshed on activity
pub const SESSION_MAX_AGE: time::Duration = time::Duration::hours(24);

/// Shortest accepted cookie signing secret, in bytes
pub const MIN_COOKIE_PASSWORD_LEN: usize = 32;

/// Error shown on the login page after a failed attempt
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Authentication settings for [`AuthenticatedRouter`]
#[derive(Clone)]
pub struct AuthOptions {
    pub authenticator: Arc<dyn Authenticator>,
    /// Secret the session cookie is signed with
    pub cookie_password: String,
    pub cookie_name: Option<String>,
}

impl AuthOptions {
    pub fn new(authenticator: Arc<dyn Authenticator>, cookie_password: impl Into<String>) -> Self {
        Self {
            authenticator,
            cookie_password: cookie_password.into(),
            cookie_name: None,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    fn cookie_name(&self) -> String {
        self.cookie_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string())
    }

    /// Derive a 64-byte signing key from the configured secret
    fn signing_key(&self) -> Result<Key, MountError> {
        if self.cookie_password.len() < MIN_COOKIE_PASSWORD_LEN {
            return Err(MountError::configuration(format!(
                "cookie password must be at least {MIN_COOKIE_PASSWORD_LEN} bytes"
            )));
        }
        let digest = Sha512::digest(self.cookie_password.as_bytes());
        Ok(Key::from(digest.as_slice()))
    }
}

/// State shared by the login/logout handlers and the gate
#[derive(Clone)]
pub(crate) struct AuthState {
    pub(crate) panel: Arc<dyn AdminPanel>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) root_path: String,
    pub(crate) login_path: String,
    relative_login: String,
    relative_logout: String,
    public_paths: Arc<HashSet<String>>,
}

impl AuthState {
    fn is_public(&self, path: &str) -> bool {
        path == self.relative_login || self.public_paths.contains(path)
    }

    fn is_logout(&self, path: &str) -> bool {
        path == self.relative_logout
    }

    /// Login URL, with `next` attached when it is a local page
    pub(crate) fn login_url(&self, next: Option<&str>) -> String {
        let Some(next) = next.filter(|target| is_local_target(target)) else {
            return self.login_path.clone();
        };
        match serde_urlencoded::to_string(&[(NEXT_PARAM, next)]) {
            Ok(query) => format!("{}?{}", self.login_path, query),
            Err(_) => self.login_path.clone(),
        }
    }
}

/// Only same-origin absolute paths are followed after login
pub(crate) fn is_local_target(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// Builds a panel router gated by session authentication.
///
/// ```ignore
/// let router = AuthenticatedRouter::new(panel, options)
///     .memory_store()
///     .build(None)?;
/// ```
pub struct AuthenticatedRouter<S = PrunedMemoryStore> {
    panel: Arc<dyn AdminPanel>,
    options: AuthOptions,
    store: Option<S>,
    pruning: Option<PrunedMemoryStore>,
    secure_cookie: bool,
}

impl AuthenticatedRouter<PrunedMemoryStore> {
    pub fn new(panel: Arc<dyn AdminPanel>, options: AuthOptions) -> Self {
        Self {
            panel,
            options,
            store: None,
            pruning: None,
            secure_cookie: true,
        }
    }
}

impl<S> AuthenticatedRouter<S>
where
    S: SessionStore + Clone,
{
    /// Use `store` for sessions
    pub fn session_store<T>(self, store: T) -> AuthenticatedRouter<T>
    where
        T: SessionStore + Clone,
    {
        AuthenticatedRouter {
            panel: self.panel,
            options: self.options,
            store: Some(store),
            pruning: None,
            secure_cookie: self.secure_cookie,
        }
    }

    /// Use an in-process store, swept every [`PRUNE_INTERVAL`] once built
    pub fn memory_store(self) -> AuthenticatedRouter<PrunedMemoryStore> {
        let store = PrunedMemoryStore::new();
        let mut builder = self.session_store(store.clone());
        builder.pruning = Some(store);
        builder
    }

    /// Mark the session cookie `Secure` (the default). Turning this off is
    /// only meant for local development over plain HTTP.
    pub fn secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    /// Build the router. Every check runs before any route is registered.
    pub fn build(self, predefined: Option<Router>) -> Result<Router, MountError> {
        let store = self.store.ok_or_else(|| {
            MountError::configuration("authenticated routing requires a session store")
        })?;
        let key = self.options.signing_key()?;
        let cookie_name = self.options.cookie_name();

        let table = RouteTable::resolve(self.panel.as_ref())?;
        let paths = self.panel.paths().clone();
        let relative_login = relative_to_root(&paths.root_path, &paths.login_path);
        let relative_logout = relative_to_root(&paths.root_path, &paths.logout_path);

        let reserved = [relative_login.as_str(), relative_logout.as_str()];
        if let Some(clash) = table
            .routes()
            .iter()
            .find(|r| reserved.contains(&r.path.as_str()))
        {
            return Err(MountError::invalid_argument(format!(
                "panel route {} clashes with the login/logout routes",
                clash.path
            )));
        }
        if table.assets().iter().any(|a| reserved.contains(&a.path.as_str())) {
            return Err(MountError::invalid_argument(
                "panel asset clashes with the login/logout routes",
            ));
        }

        if self.pruning.is_some() && tokio::runtime::Handle::try_current().is_err() {
            return Err(MountError::configuration(
                "session pruning requires a Tokio runtime",
            ));
        }

        let state = AuthState {
            panel: Arc::clone(&self.panel),
            authenticator: Arc::clone(&self.options.authenticator),
            root_path: paths.root_path.clone(),
            login_path: paths.login_path.clone(),
            relative_login: relative_login.clone(),
            relative_logout: relative_logout.clone(),
            public_paths: Arc::new(table.asset_paths().into_iter().collect()),
        };

        let session_layer = SessionManagerLayer::new(store)
            .with_name(cookie_name.clone())
            .with_secure(self.secure_cookie)
            .with_http_only(true)
            .with_same_site(SameSite::Lax)
            .with_expiry(Expiry::OnInactivity(SESSION_MAX_AGE))
            .with_signed(key);

        let router = table.mount(Arc::clone(&self.panel), predefined.unwrap_or_default())?;
        let login_state = state.clone();
        let router = register_routes(move || {
            router
                .route(
                    &relative_login,
                    get(routes::login_view)
                        .post(routes::login_submit)
                        .with_state(login_state.clone()),
                )
                .route(&relative_logout, get(routes::logout).with_state(login_state))
                // Unmatched paths still pass the gate, so anonymous users get
                // the login redirect instead of a 404
                .fallback(|| async { StatusCode::NOT_FOUND })
        })?
        .layer(middleware::from_fn_with_state(state, gate::gate))
        .layer(session_layer);

        if let Some(store) = self.pruning {
            store.spawn_pruning(PRUNE_INTERVAL);
        }

        tracing::info!(
            root = %paths.root_path,
            login = %paths.login_path,
            cookie = %cookie_name,
            secure = self.secure_cookie,
            "Authenticated panel router built"
        );
        Ok(router)
    }
}
