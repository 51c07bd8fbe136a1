// ABOUTME: Root library module: mounts admin-panel route descriptors onto axum routers
// ABOUTME: router builds the plain panel router; auth wraps it with session login and an access gate

pub mod demo;
pub mod error;
pub mod panel;
pub mod path;
pub mod request;
pub mod router;
pub mod static_panel;
pub mod templates;

#[cfg(feature = "auth")]
pub mod auth;
#[cfg(feature = "auth")]
pub mod config;

pub use error::{ActionError, MountError};
pub use panel::{
    action, ActionHandler, AdminPanel, AssetDescriptor, ControllerContext, CurrentAdmin,
    LoginPage, PanelPaths, RouteDescriptor,
};
pub use request::{ActionOutput, ActionRequest, ActionResult};
pub use router::{build_router, RouteTable};
pub use static_panel::StaticPanel;

#[cfg(feature = "auth")]
pub use auth::{AuthOptions, AuthenticatedRouter, Authenticator};
