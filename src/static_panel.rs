// ABOUTME: In-memory AdminPanel assembled from descriptors, with an askama login page
// ABOUTME: Used by the demo server and by tests; real panels implement AdminPanel themselves

use askama::Template;
use axum::http::Method;

use crate::panel::{ActionHandler, AdminPanel, AssetDescriptor, LoginPage, PanelPaths, RouteDescriptor};
use crate::templates::LoginTemplate;

const DEFAULT_BRANDING: &str = "Admin Panel";

#[derive(Debug, Clone)]
pub struct StaticPanel {
    paths: PanelPaths,
    branding: String,
    stylesheet: Option<String>,
    routes: Vec<RouteDescriptor>,
    assets: Vec<AssetDescriptor>,
}

impl StaticPanel {
    pub fn new(paths: PanelPaths) -> Self {
        Self {
            paths,
            branding: DEFAULT_BRANDING.to_string(),
            stylesheet: None,
            routes: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn branding(mut self, branding: impl Into<String>) -> Self {
        self.branding = branding.into();
        self
    }

    /// Stylesheet URL linked from the login page
    pub fn stylesheet(mut self, href: impl Into<String>) -> Self {
        self.stylesheet = Some(href.into());
        self
    }

    pub fn route(
        mut self,
        method: Method,
        path: &str,
        controller: &str,
        action: &str,
        handler: ActionHandler,
    ) -> Self {
        self.routes
            .push(RouteDescriptor::new(method, path, controller, action, handler));
        self
    }

    pub fn asset(mut self, asset: AssetDescriptor) -> Self {
        self.assets.push(asset);
        self
    }
}

impl AdminPanel for StaticPanel {
    fn paths(&self) -> &PanelPaths {
        &self.paths
    }

    fn routes(&self) -> Vec<RouteDescriptor> {
        self.routes.clone()
    }

    fn assets(&self) -> Vec<AssetDescriptor> {
        self.assets.clone()
    }

    fn render_login(&self, page: &LoginPage) -> anyhow::Result<String> {
        let template = LoginTemplate {
            branding: self.branding.clone(),
            action: page.action.clone(),
            error_message: page.error_message.clone(),
            stylesheet: self.stylesheet.clone(),
        };
        Ok(template.render()?)
    }
}
