// ABOUTME: Demo panel served by the binary: a dashboard plus list/show/edit actions over in-memory records
// ABOUTME: Shows how a panel supplies descriptors whose handlers read the controller context

use askama::Template;
use axum::http::Method;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ActionError;
use crate::panel::{action, AssetDescriptor, ControllerContext, PanelPaths};
use crate::request::{ActionOutput, ActionRequest, ActionResult};
use crate::static_panel::StaticPanel;
use crate::templates::{DashboardTemplate, ResourceSummary};

type Records = BTreeMap<String, Map<String, Value>>;

/// Resource name → record id → record
#[derive(Debug, Clone, Default)]
pub struct RecordStore(Arc<RwLock<BTreeMap<String, Records>>>);

impl RecordStore {
    /// A store with a couple of sample resources
    pub fn seeded() -> Self {
        let mut resources = BTreeMap::new();
        let mut posts = Records::new();
        for (id, title) in [("1", "Hello world"), ("2", "Release notes")] {
            posts.insert(id.to_string(), json_object(json!({ "id": id, "title": title })));
        }
        resources.insert("posts".to_string(), posts);

        let mut users = Records::new();
        users.insert(
            "1".to_string(),
            json_object(json!({ "id": "1", "email": "editor@example.com" })),
        );
        resources.insert("users".to_string(), users);

        Self(Arc::new(RwLock::new(resources)))
    }

    async fn summaries(&self) -> Vec<ResourceSummary> {
        self.0
            .read()
            .await
            .iter()
            .map(|(name, records)| ResourceSummary {
                name: name.clone(),
                records: records.len(),
            })
            .collect()
    }

    async fn list(&self, resource: &str) -> Result<Vec<Map<String, Value>>, ActionError> {
        let resources = self.0.read().await;
        let records = resources
            .get(resource)
            .ok_or_else(|| ActionError::not_found(format!("Unknown resource: {resource}")))?;
        Ok(records.values().cloned().collect())
    }

    async fn get(&self, resource: &str, id: &str) -> Result<Map<String, Value>, ActionError> {
        let resources = self.0.read().await;
        resources
            .get(resource)
            .and_then(|records| records.get(id))
            .cloned()
            .ok_or_else(|| ActionError::not_found(format!("Record {id} not found in {resource}")))
    }

    async fn update(
        &self,
        resource: &str,
        id: &str,
        changes: Map<String, Value>,
    ) -> Result<Map<String, Value>, ActionError> {
        let mut resources = self.0.write().await;
        let record = resources
            .get_mut(resource)
            .and_then(|records| records.get_mut(id))
            .ok_or_else(|| ActionError::not_found(format!("Record {id} not found in {resource}")))?;
        for (key, value) in changes {
            if key != "id" {
                record.insert(key, value);
            }
        }
        Ok(record.clone())
    }
}

fn json_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Build the demo panel at `root_path`, serving `panel.css` from `assets_dir`
pub fn demo_panel(
    root_path: &str,
    branding: &str,
    assets_dir: &Path,
    records: RecordStore,
) -> StaticPanel {
    let paths = PanelPaths::under(root_path);
    let base = paths.root_path.trim_end_matches('/').to_string();
    let stylesheet = format!("{base}/frontend/assets/panel.css");
    let logout_path = paths.logout_path.clone();
    let dashboard_branding = branding.to_string();

    let dashboard_records = records.clone();
    let list_records = records.clone();
    let show_records = records.clone();
    let edit_records = records;

    StaticPanel::new(paths)
        .branding(branding)
        .stylesheet(stylesheet.clone())
        .route(
            Method::GET,
            "",
            "DashboardController",
            "index",
            action(move |ctx: ControllerContext, _req: ActionRequest| {
                let records = dashboard_records.clone();
                let template = DashboardTemplate {
                    branding: dashboard_branding.clone(),
                    admin_email: ctx.current_admin.map(|admin| admin.email),
                    logout_path: logout_path.clone(),
                    stylesheet: stylesheet.clone(),
                    resources: Vec::new(),
                };
                async move {
                    let template = DashboardTemplate {
                        resources: records.summaries().await,
                        ..template
                    };
                    let html = template.render().map_err(|e| {
                        ActionError::internal(format!("Failed to render dashboard: {e}"))
                    })?;
                    ActionResult::Ok(ActionOutput::Html(html))
                }
            }),
        )
        .route(
            Method::GET,
            "/api/resources/{resourceId}/actions/list",
            "ResourceController",
            "list",
            action(move |_ctx, req: ActionRequest| {
                let records = list_records.clone();
                async move {
                    let resource = req.param("resourceId").unwrap_or_default();
                    let list = records.list(resource).await?;
                    ActionResult::Ok(json!({ "records": list }).into())
                }
            }),
        )
        .route(
            Method::GET,
            "/api/resources/{resourceId}/records/{recordId}/show",
            "RecordController",
            "show",
            action(move |_ctx, req: ActionRequest| {
                let records = show_records.clone();
                async move {
                    let resource = req.param("resourceId").unwrap_or_default();
                    let id = req.param("recordId").unwrap_or_default();
                    let record = records.get(resource, id).await?;
                    ActionResult::Ok(json!({ "record": record }).into())
                }
            }),
        )
        .route(
            Method::POST,
            "/api/resources/{resourceId}/records/{recordId}/edit",
            "RecordController",
            "edit",
            action(move |ctx: ControllerContext, req: ActionRequest| {
                let records = edit_records.clone();
                async move {
                    let resource = req.param("resourceId").unwrap_or_default();
                    let id = req.param("recordId").unwrap_or_default();
                    let record = records.update(resource, id, req.payload.clone()).await?;
                    tracing::info!(
                        resource = %resource,
                        record = %id,
                        admin = ?ctx.current_admin.map(|a| a.email),
                        "Record updated"
                    );
                    ActionResult::Ok(json!({ "record": record }).into())
                }
            }),
        )
        .route(
            // Dropped by the router builder: only GET and POST are mounted
            Method::DELETE,
            "/api/resources/{resourceId}/records/{recordId}",
            "RecordController",
            "delete",
            action(|_ctx, _req| async { ActionResult::Ok(ActionOutput::Empty) }),
        )
        .asset(AssetDescriptor::new(
            "/frontend/assets/panel.css",
            assets_dir.join("panel.css"),
        ))
}
