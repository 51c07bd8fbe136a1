// ABOUTME: Normalized action request (path params, query, parsed body, method) and action output
// ABOUTME: ActionRequest is an axum extractor; ActionOutput renders non-empty results verbatim

use axum::{
    body::to_bytes,
    extract::{rejection::PathRejection, FromRequest, FromRequestParts, Path, Query, Request},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ActionError;

/// Result of running an action
pub type ActionResult = Result<ActionOutput, ActionError>;

/// Largest request body an action will accept
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request context handed to an action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub method: Method,
    /// Values captured by route placeholders
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Parsed JSON object or url-encoded form; empty for other bodies
    pub payload: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            params: HashMap::new(),
            query: HashMap::new(),
            payload: Map::new(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// String-valued payload field
    pub fn payload_str(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }
}

impl<S> FromRequest<S> for ActionRequest
where
    S: Send + Sync,
{
    type Rejection = ActionError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
        {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(e) => return Err(ActionError::bad_request(e.body_text())),
        };

        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| ActionError::bad_request(e.body_text()))?;

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = to_bytes(body, BODY_LIMIT).await.map_err(|_| {
            ActionError::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
        })?;

        let payload = parse_payload(&content_type, &bytes)?;

        Ok(Self {
            method: parts.method,
            params,
            query,
            payload,
        })
    }
}

/// Parse a request body into a payload object based on its content type
pub fn parse_payload(content_type: &str, body: &[u8]) -> Result<Map<String, Value>, ActionError> {
    if body.is_empty() {
        return Ok(Map::new());
    }

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        return match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ActionError::bad_request("JSON body must be an object")),
            Err(e) => Err(ActionError::bad_request(format!("Invalid JSON body: {e}"))),
        };
    }

    if mime == "application/x-www-form-urlencoded" {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| ActionError::bad_request(format!("Invalid form body: {e}")))?;
        return Ok(pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect());
    }

    tracing::debug!(content_type = %content_type, "Ignoring body with unsupported content type");
    Ok(Map::new())
}

/// What an action produced
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    Empty,
    Html(String),
    Json(Value),
    Text(String),
}

impl ActionOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            ActionOutput::Empty => true,
            ActionOutput::Html(s) | ActionOutput::Text(s) => s.is_empty(),
            ActionOutput::Json(v) => v.is_null(),
        }
    }
}

impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        ActionOutput::Json(value)
    }
}

impl From<String> for ActionOutput {
    fn from(text: String) -> Self {
        ActionOutput::Text(text)
    }
}

impl IntoResponse for ActionOutput {
    fn into_response(self) -> Response {
        if self.is_empty() {
            return StatusCode::NO_CONTENT.into_response();
        }
        match self {
            ActionOutput::Html(html) => Html(html).into_response(),
            ActionOutput::Json(value) => Json(value).into_response(),
            ActionOutput::Text(text) => text.into_response(),
            ActionOutput::Empty => StatusCode::NO_CONTENT.into_response(),
        }
    }
}
