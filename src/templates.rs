// ABOUTME: Askama template structs for the built-in login page and demo dashboard
// ABOUTME: Templates are compiled into the binary at build time

use askama::Template;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub branding: String,
    pub action: String,
    pub error_message: Option<String>,
    pub stylesheet: Option<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub branding: String,
    pub admin_email: Option<String>,
    pub logout_path: String,
    pub stylesheet: String,
    pub resources: Vec<ResourceSummary>,
}

/// One row of the dashboard's resource table
#[derive(Debug, Clone)]
pub struct ResourceSummary {
    pub name: String,
    pub records: usize,
}
