//! Static file serving.
//!
//! Serves the build directory. HTML pages get the client script injected
//! when live patching is enabled.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use lp_protocol::CLIENT_SCRIPT_PATH;

use crate::pages;
use crate::state::AppState;

/// Page served with status 404 when present in the build directory.
const NOT_FOUND_PAGE: &str = "404.html";

/// Create router for static file serving.
pub(crate) fn static_router() -> Router<Arc<AppState>> {
    Router::new().fallback(serve_file)
}

/// Serve the rendered client script.
pub(crate) async fn client_script(State(state): State<Arc<AppState>>) -> Response {
    match &state.client_script {
        Some(script) => (
            [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
            script.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve a file from the build directory.
async fn serve_file(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let path = uri.path();

    let Some((key, file)) = pages::resolve(&state.build_dir, path).await else {
        tracing::debug!(path, "No file for request");
        return not_found(&state).await;
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => file_response(&state, &key, bytes, StatusCode::OK),
        Err(err) => {
            tracing::warn!(%err, file = %file.display(), "Cannot read file");
            not_found(&state).await
        }
    }
}

/// Serve the build directory's 404 page, or an empty 404.
async fn not_found(state: &AppState) -> Response {
    match tokio::fs::read(state.build_dir.join(NOT_FOUND_PAGE)).await {
        Ok(bytes) => file_response(state, NOT_FOUND_PAGE, bytes, StatusCode::NOT_FOUND),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn file_response(state: &AppState, key: &str, bytes: Vec<u8>, status: StatusCode) -> Response {
    let mime = mime_guess::from_path(Path::new(key)).first_or_octet_stream();

    if pages::is_html(key) && state.live_patch_enabled() {
        match String::from_utf8(bytes) {
            Ok(html) => {
                return (
                    status,
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    inject_script(&html),
                )
                    .into_response();
            }
            Err(err) => {
                tracing::debug!(key, "Serving non-UTF-8 page without client script");
                return (status, [(header::CONTENT_TYPE, mime.to_string())], err.into_bytes())
                    .into_response();
            }
        }
    }

    (status, [(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
}

/// Insert the client script tag before the last `</body>`, or append it.
pub(crate) fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_SCRIPT_PATH}"></script>"#);
    // ASCII lowercasing keeps byte offsets intact.
    let lower = html.to_ascii_lowercase();

    let mut out = String::with_capacity(html.len() + tag.len());
    match lower.rfind("</body>") {
        Some(pos) => {
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
        }
        None => {
            out.push_str(html);
            out.push_str(&tag);
        }
    }
    out
}
