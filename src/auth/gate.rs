// ABOUTME: Access gate middleware in front of every panel route
// ABOUTME: Passes assets and the login page, passes logged-in admins, redirects everyone else to login

use axum::{
    extract::{OriginalUri, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::{AuthState, ADMIN_USER_KEY};
use crate::error::ActionError;
use crate::panel::CurrentAdmin;

/// Gate middleware.
///
/// Authentication flow:
/// 1. Asset paths and the login path → proceed
/// 2. Session carries a principal → insert it into request extensions, proceed
/// 3. Otherwise → redirect to the login path, carrying the requested page in
///    `?next=` for GET navigations
///
/// Anonymous requests never write to the session store.
pub(crate) async fn gate(
    State(state): State<AuthState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    if state.is_public(request.uri().path()) {
        return next.run(request).await;
    }

    match session.get::<CurrentAdmin>(ADMIN_USER_KEY).await {
        Ok(Some(admin)) => {
            request.extensions_mut().insert(admin);
            next.run(request).await
        }
        Ok(None) => {
            let target = return_target(&state, &request);
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                next = ?target,
                "Unauthenticated panel request, redirecting to login"
            );
            Redirect::to(&state.login_url(target.as_deref())).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read session");
            ActionError::internal("Session store unavailable").into_response()
        }
    }
}

/// Page to come back to after login: only GET navigations, never logout,
/// and nothing when it would be the panel root anyway.
fn return_target(state: &AuthState, request: &Request) -> Option<String> {
    if request.method() != Method::GET || state.is_logout(request.uri().path()) {
        return None;
    }
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .filter(|target| *target != state.root_path)
}
