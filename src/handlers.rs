use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::dispatch::{Activation, Dispatcher, MenuEntries, MenuEntry, TabOpener};
use crate::registry::RegistryError;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub menu: Arc<MenuEntries>,
    pub disable_cache: bool,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub target: Option<String>,
    pub text: Option<String>,
}

#[derive(Serialize)]
struct TargetsResponse<'a> {
    items: &'a [MenuEntry],
}

#[derive(Serialize)]
struct LookupResponse {
    target: String,
    url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(frontend))
        .route("/robots.txt", get(robots))
        .route("/healthz", get(healthz))
        .route("/lookup", get(open_lookup))
        .route("/v1/targets", get(targets))
        .route("/v1/lookup", get(lookup))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn robots(State(state): State<AppState>) -> Response {
    let body = "User-agent: *\nDisallow: /";
    if state.disable_cache {
        return body.into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400, immutable"),
        )],
        body,
    )
        .into_response()
}

async fn frontend(State(state): State<AppState>) -> Response {
    let html = Html(index_html(state.menu.entries()));
    if state.disable_cache {
        return html.into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        )],
        html,
    )
        .into_response()
}

async fn targets(State(state): State<AppState>) -> Response {
    let body = Json(TargetsResponse {
        items: state.menu.entries(),
    });
    if state.disable_cache {
        return body.into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        )],
        body,
    )
        .into_response()
}

async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let target = required_target(params.target)?;
    let url = state
        .dispatcher
        .lookup_url(&target, params.text.as_deref().unwrap_or_default())?;
    Ok(Json(LookupResponse { target, url }))
}

/// Captures the URL the dispatcher asks to open so it can become a redirect.
#[derive(Default)]
struct Redirector {
    location: Option<String>,
}

impl TabOpener for Redirector {
    fn open_tab(&mut self, url: String) {
        self.location = Some(url);
    }
}

async fn open_lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Response, ApiError> {
    let target_id = required_target(params.target)?;
    let activation = Activation {
        target_id,
        selection_text: params.text.unwrap_or_default(),
    };
    let mut redirector = Redirector::default();
    state.dispatcher.on_activation(&activation, &mut redirector);

    let Some(url) = redirector.location else {
        return Err(ApiError::NotFound(format!(
            "unknown lookup target: {}",
            activation.target_id
        )));
    };
    let location = HeaderValue::from_str(&location_header(&url)).map_err(|err| {
        warn!("lookup url is not a valid location header: {err}");
        ApiError::Internal
    })?;
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

fn required_target(target: Option<String>) -> Result<String, ApiError> {
    match target {
        Some(target) if !target.trim().is_empty() => Ok(target),
        _ => Err(ApiError::bad_request("target is required")),
    }
}

/// Characters a browser escapes when navigating to a typed URL. Non-ASCII is
/// always escaped as UTF-8.
const LOCATION_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`');

fn location_header(url: &str) -> String {
    utf8_percent_encode(url, LOCATION_UNSAFE).to_string()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            other => {
                warn!("registry error during lookup: {other}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::NotFound(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

const PAGE_HTML: &str = r#"<!doctype html>
<html lang="is">
<head>
<meta charset="utf-8">
<title>Icelandic Lookup</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }
textarea { width: 100%; min-height: 6rem; font-size: 1rem; }
.targets button { display: block; margin: 0.4rem 0; padding: 0.4rem 0.8rem; }
</style>
</head>
<body>
<h1>Icelandic Lookup</h1>
<form action="/lookup" method="get" target="_blank">
<textarea name="text" placeholder="hestur" autofocus></textarea>
<div class="targets">
{{entries}}
</div>
</form>
</body>
</html>
"#;

fn index_html(entries: &[MenuEntry]) -> String {
    let buttons: Vec<String> = entries
        .iter()
        .map(|entry| {
            format!(
                r#"<button type="submit" name="target" value="{}">{}</button>"#,
                escape_html(&entry.id),
                escape_html(&entry.title)
            )
        })
        .collect();
    PAGE_HTML.replace("{{entries}}", &buttons.join("\n"))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_header_escapes_raw_utf8_and_spaces() {
        assert_eq!(location_header("http://x/?q=a b"), "http://x/?q=a%20b");
        assert_eq!(location_header("http://x/?q=%FEing"), "http://x/?q=%FEing");
        assert_eq!(location_header("http://x/?q=ß"), "http://x/?q=%C3%9F");
    }

    #[test]
    fn page_lists_entries_as_buttons() {
        let entry = MenuEntry {
            id: "binHeadword".to_string(),
            title: "Morphology <BÍN>".to_string(),
            contexts: Vec::new(),
            filter: crate::FilterKind::None,
        };
        let html = index_html(&[entry]);
        assert!(html.contains(r#"value="binHeadword""#));
        assert!(html.contains("Morphology &lt;BÍN&gt;"));
        assert!(!html.contains("{{entries}}"));
    }
}
