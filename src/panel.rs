// ABOUTME: The admin-panel collaborator seam: route/asset descriptors and the AdminPanel trait
// ABOUTME: Descriptors carry their handler functions so dispatch is resolved when the router is built

use axum::http::Method;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ActionError, MountError};
use crate::request::{ActionOutput, ActionRequest};

/// Future returned by an action handler
pub type ActionFuture = BoxFuture<'static, Result<ActionOutput, ActionError>>;

/// Handler invoked for one route: receives a fresh controller context and the
/// normalized request.
pub type ActionHandler = Arc<dyn Fn(ControllerContext, ActionRequest) -> ActionFuture + Send + Sync>;

/// Wrap an async function as an [`ActionHandler`].
pub fn action<F, Fut>(f: F) -> ActionHandler
where
    F: Fn(ControllerContext, ActionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionOutput, ActionError>> + Send + 'static,
{
    Arc::new(move |ctx, req| Box::pin(f(ctx, req)))
}

// =============================================================================
// Descriptors
// =============================================================================

/// One endpoint supplied by the admin panel
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Path template with `{name}` (or `:name`) placeholders
    pub path: String,
    /// Controller name, used for logging
    pub controller: String,
    /// Action name, used for logging
    pub action: String,
    pub handler: ActionHandler,
}

impl RouteDescriptor {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
        handler: ActionHandler,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            controller: controller.into(),
            action: action.into(),
            handler,
        }
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("controller", &self.controller)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// A static file exposed at a URL path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub path: String,
    pub src: PathBuf,
}

impl AssetDescriptor {
    pub fn new(path: impl Into<String>, src: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            src: src.into(),
        }
    }
}

// =============================================================================
// Principal and controller context
// =============================================================================

/// The authenticated admin stored in the session after login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CurrentAdmin {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            title: None,
            avatar_url: None,
            id: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Per-request controller binding: the panel plus whoever is logged in
#[derive(Clone)]
pub struct ControllerContext {
    pub panel: Arc<dyn AdminPanel>,
    pub current_admin: Option<CurrentAdmin>,
}

// =============================================================================
// AdminPanel
// =============================================================================

/// URL layout of a panel. All paths are absolute; login and logout live
/// under the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelPaths {
    pub root_path: String,
    pub login_path: String,
    pub logout_path: String,
}

impl PanelPaths {
    /// Paths for a panel at `root`, with `/login` and `/logout` under it
    pub fn under(root: &str) -> Self {
        let base = root.trim_end_matches('/');
        let root_path = if base.is_empty() { "/".to_string() } else { base.to_string() };
        Self {
            root_path,
            login_path: format!("{base}/login"),
            logout_path: format!("{base}/logout"),
        }
    }

    /// Reject layouts that cannot be mounted
    pub fn validate(&self) -> Result<(), MountError> {
        if !self.root_path.starts_with('/') {
            return Err(MountError::invalid_argument(format!(
                "panel root path must be absolute, got {:?}",
                self.root_path
            )));
        }
        let base = self.root_path.trim_end_matches('/');
        for (label, path) in [("login", &self.login_path), ("logout", &self.logout_path)] {
            let under_root = path
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1);
            if !under_root {
                return Err(MountError::invalid_argument(format!(
                    "panel {label} path {path:?} is not under root {:?}",
                    self.root_path
                )));
            }
        }
        if self.login_path == self.logout_path {
            return Err(MountError::invalid_argument(
                "panel login and logout paths must differ",
            ));
        }
        Ok(())
    }
}

impl Default for PanelPaths {
    fn default() -> Self {
        Self::under("/admin")
    }
}

/// Model passed to the panel's login renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPage {
    /// Form action the login page must post to
    pub action: String,
    pub error_message: Option<String>,
}

/// The admin-panel framework as seen by the router builders
pub trait AdminPanel: Send + Sync + 'static {
    fn paths(&self) -> &PanelPaths;

    fn routes(&self) -> Vec<RouteDescriptor>;

    fn assets(&self) -> Vec<AssetDescriptor>;

    /// Render the login page to HTML
    fn render_login(&self, page: &LoginPage) -> anyhow::Result<String>;
}
