// ABOUTME: Router builder that mounts a panel's route and asset descriptors onto an axum Router
// ABOUTME: Resolves a static {method, path, handler} table up front, then registers it in one pass

use axum::{
    extract::{FromRequest, Request},
    http::Method,
    response::{IntoResponse, Response},
    routing::{get, get_service, post, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeFile};

use crate::error::MountError;
use crate::panel::{ActionHandler, AdminPanel, ControllerContext, CurrentAdmin, RouteDescriptor};
use crate::path::translate_path;
use crate::request::ActionRequest;

/// Methods the router builder registers. Anything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(RouteMethod::Get),
            Method::POST => Some(RouteMethod::Post),
            _ => None,
        }
    }
}

/// A descriptor after path translation
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub method: RouteMethod,
    pub path: String,
    pub descriptor: RouteDescriptor,
}

/// An asset after path validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub path: String,
    pub src: PathBuf,
}

/// Everything a panel asks to be mounted, validated and translated but not yet
/// registered on any router.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<ResolvedRoute>,
    assets: Vec<ResolvedAsset>,
    skipped: usize,
}

impl RouteTable {
    /// Validate the panel and translate its descriptors
    pub fn resolve(panel: &dyn AdminPanel) -> Result<Self, MountError> {
        panel.paths().validate()?;

        let mut seen: HashSet<(RouteMethod, String)> = HashSet::new();
        let mut placeholders: HashMap<String, String> = HashMap::new();
        let mut routes = Vec::new();
        let mut skipped = 0;

        for descriptor in panel.routes() {
            let Some(method) = RouteMethod::from_method(&descriptor.method) else {
                tracing::debug!(
                    method = %descriptor.method,
                    path = %descriptor.path,
                    controller = %descriptor.controller,
                    action = %descriptor.action,
                    "Skipping route with unsupported method"
                );
                skipped += 1;
                continue;
            };

            let path = translate_path(&descriptor.path)?;
            if !seen.insert((method, path.clone())) {
                return Err(MountError::invalid_argument(format!(
                    "duplicate route {} {}",
                    descriptor.method, path
                )));
            }
            check_placeholder_names(&mut placeholders, &path)?;

            routes.push(ResolvedRoute {
                method,
                path,
                descriptor,
            });
        }

        let mut assets = Vec::new();
        for asset in panel.assets() {
            let path = translate_path(&asset.path)?;
            if path.contains('{') {
                return Err(MountError::invalid_argument(format!(
                    "asset path {:?} must not contain placeholders",
                    asset.path
                )));
            }
            if !seen.insert((RouteMethod::Get, path.clone())) {
                return Err(MountError::invalid_argument(format!(
                    "asset path {path} collides with another GET route"
                )));
            }
            assets.push(ResolvedAsset {
                path,
                src: asset.src,
            });
        }

        Ok(Self {
            routes,
            assets,
            skipped,
        })
    }

    pub fn routes(&self) -> &[ResolvedRoute] {
        &self.routes
    }

    pub fn assets(&self) -> &[ResolvedAsset] {
        &self.assets
    }

    /// Number of descriptors dropped for having a method other than GET/POST
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Asset URL paths, as seen inside the mounted router
    pub fn asset_paths(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.path.clone()).collect()
    }

    /// Register every route and asset on `router`. Fails if `router` already
    /// serves one of the panel's method and path pairs.
    pub fn mount(self, panel: Arc<dyn AdminPanel>, router: Router) -> Result<Router, MountError> {
        let route_count = self.routes.len();
        let asset_count = self.assets.len();
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for route in self.routes {
            tracing::debug!(
                method = ?route.method,
                path = %route.path,
                controller = %route.descriptor.controller,
                action = %route.descriptor.action,
                "Registering panel route"
            );
            let endpoint = action_endpoint(Arc::clone(&panel), route.method, route.descriptor);
            let entry = by_path.remove(&route.path).unwrap_or_else(MethodRouter::new);
            by_path.insert(route.path, entry.merge(endpoint));
        }

        for asset in self.assets {
            tracing::debug!(path = %asset.path, src = %asset.src.display(), "Registering panel asset");
            let endpoint = get_service(ServeFile::new(&asset.src));
            let entry = by_path.remove(&asset.path).unwrap_or_else(MethodRouter::new);
            by_path.insert(asset.path, entry.merge(endpoint));
        }

        let router = register_routes(move || {
            by_path
                .into_iter()
                .fold(router, |router, (path, endpoint)| router.route(&path, endpoint))
        })?;

        tracing::info!(
            routes = route_count,
            assets = asset_count,
            skipped = self.skipped,
            "Panel routes mounted"
        );
        Ok(router)
    }
}

/// Record the placeholder name used at each position of `path`, keyed by the
/// route shape leading up to it. axum refuses two routes that name the same
/// position differently (`/pages/{id}` next to `/pages/{pageName}`).
fn check_placeholder_names(
    names: &mut HashMap<String, String>,
    path: &str,
) -> Result<(), MountError> {
    let mut shape = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            shape.push('/');
            shape.push_str(segment);
            continue;
        };
        let (kind, name) = match inner.strip_prefix('*') {
            Some(name) => ("{*}", name),
            None => ("{}", inner),
        };
        shape.push('/');
        shape.push_str(kind);
        match names.get(&shape) {
            Some(existing) if existing != name => {
                return Err(MountError::invalid_argument(format!(
                    "route {path} names placeholder {{{name}}} where another route uses {{{existing}}}"
                )));
            }
            Some(_) => {}
            None => {
                names.insert(shape.clone(), name.to_string());
            }
        }
    }
    Ok(())
}

/// Run route registration, turning axum's conflict panics into an error.
/// Overlaps with routes already on a caller-supplied router only surface here.
pub(crate) fn register_routes<F>(register: F) -> Result<Router, MountError>
where
    F: FnOnce() -> Router,
{
    std::panic::catch_unwind(AssertUnwindSafe(register)).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "route registration failed".to_string());
        tracing::error!(reason = %reason, "Panel route conflicts with an existing route");
        MountError::invalid_argument(format!("conflicting route: {reason}"))
    })
}

/// Build a router serving every route and asset of `panel`.
///
/// Routes are added to `predefined` when given; a predefined route on the
/// same method and path as a panel route is an `InvalidArgument`. Paths are
/// relative to the panel root, so the result is meant to be nested at
/// `paths().root_path`.
pub fn build_router(
    panel: Arc<dyn AdminPanel>,
    predefined: Option<Router>,
) -> Result<Router, MountError> {
    let table = RouteTable::resolve(panel.as_ref())?;
    table.mount(panel, predefined.unwrap_or_default())
}

struct RouteLabel {
    controller: String,
    action: String,
}

fn action_endpoint(
    panel: Arc<dyn AdminPanel>,
    method: RouteMethod,
    descriptor: RouteDescriptor,
) -> MethodRouter {
    let label = Arc::new(RouteLabel {
        controller: descriptor.controller,
        action: descriptor.action,
    });
    let handler = descriptor.handler;

    let endpoint = move |request: Request| {
        let panel = Arc::clone(&panel);
        let label = Arc::clone(&label);
        let handler = Arc::clone(&handler);
        async move { dispatch(panel, &label, handler, request).await }
    };

    let method_router = match method {
        RouteMethod::Get => get(endpoint),
        RouteMethod::Post => post(endpoint),
    };
    method_router.layer(CatchPanicLayer::new())
}

async fn dispatch(
    panel: Arc<dyn AdminPanel>,
    label: &RouteLabel,
    handler: ActionHandler,
    request: Request,
) -> Response {
    let current_admin = request.extensions().get::<CurrentAdmin>().cloned();

    let action_request = match ActionRequest::from_request(request, &()).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(
                controller = %label.controller,
                action = %label.action,
                error = %e.message,
                "Rejected malformed action request"
            );
            return e.into_response();
        }
    };

    let context = ControllerContext {
        panel,
        current_admin,
    };

    match handler(context, action_request).await {
        Ok(output) => output.into_response(),
        Err(e) => {
            tracing::error!(
                controller = %label.controller,
                action = %label.action,
                status = %e.status,
                error = %e.message,
                "Panel action failed"
            );
            e.into_response()
        }
    }
}
