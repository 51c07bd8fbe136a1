// ABOUTME: Login and logout handlers for the authenticated panel router
// ABOUTME: Login stores the principal in the session; logout flushes the session

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use super::{is_local_target, AuthState, ADMIN_USER_KEY, INVALID_CREDENTIALS, NEXT_PARAM};
use crate::error::ActionError;
use crate::panel::{CurrentAdmin, LoginPage};
use crate::request::ActionRequest;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginQuery {
    next: Option<String>,
}

pub(crate) async fn login_view(
    State(state): State<AuthState>,
    Query(query): Query<LoginQuery>,
) -> Response {
    render_login(&state, query.next.as_deref(), None)
}

pub(crate) async fn login_submit(
    State(state): State<AuthState>,
    session: Session,
    request: ActionRequest,
) -> Response {
    let next = request
        .query
        .get(NEXT_PARAM)
        .map(String::as_str)
        .filter(|target| is_local_target(target));

    let (Some(email), Some(password)) = (
        request.payload_str("email"),
        request.payload_str("password"),
    ) else {
        tracing::warn!("Login attempt without email or password");
        return render_login(&state, next, Some(INVALID_CREDENTIALS));
    };

    let principal = match state.authenticator.authenticate(email, password).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            tracing::warn!(email = %email, "Login failed: invalid credentials");
            return render_login(&state, next, Some(INVALID_CREDENTIALS));
        }
        Err(e) => {
            tracing::error!(error = %e, email = %email, "Authenticator failed");
            return ActionError::internal("Authentication service unavailable").into_response();
        }
    };

    // New id for the authenticated session
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to rotate session id");
        return ActionError::internal("Session error. Try again.").into_response();
    }
    if let Err(e) = session.insert(ADMIN_USER_KEY, &principal).await {
        tracing::error!(error = %e, "Failed to set session data");
        return ActionError::internal("Session error. Try again.").into_response();
    }

    let redirect_to = next.unwrap_or(state.root_path.as_str());
    tracing::info!(email = %principal.email, redirect_to = %redirect_to, "Admin logged in");
    Redirect::to(redirect_to).into_response()
}

pub(crate) async fn logout(State(state): State<AuthState>, session: Session) -> Response {
    let email = session
        .get::<CurrentAdmin>(ADMIN_USER_KEY)
        .await
        .ok()
        .flatten()
        .map(|admin| admin.email);

    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to destroy session on logout");
    } else if let Some(email) = email {
        tracing::info!(email = %email, "Admin logged out");
    }

    Redirect::to(&state.login_path).into_response()
}

/// Render the login page; the form posts back to the login URL with `next` kept
fn render_login(state: &AuthState, next: Option<&str>, error_message: Option<&str>) -> Response {
    let page = LoginPage {
        action: state.login_url(next),
        error_message: error_message.map(str::to_string),
    };
    match state.panel.render_login(&page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render login page");
            ActionError::internal("Failed to render login page").into_response()
        }
    }
}
