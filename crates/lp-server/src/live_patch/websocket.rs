//! WebSocket handler for live patching.
//!
//! Subscribes each connection to one page and forwards that page's patches.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::Uri;
use axum::response::IntoResponse;
use lp_protocol::{LIVE_PATCH_ENDPOINT, PatchMessage};

use super::registry::PatchReceiver;
use crate::state::AppState;

/// Handle WebSocket upgrade without a page in the URL.
///
/// The client names its page in its first text frame.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state, None))
}

/// Handle WebSocket upgrade with the page path appended to the endpoint.
///
/// Reads the raw request path: the page key lookup decodes it exactly once,
/// the same way it decodes paths sent in text frames.
pub(crate) async fn ws_page_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> impl IntoResponse {
    let path = page_path(uri.path()).to_owned();
    ws.on_upgrade(|socket| handle_socket(socket, state, Some(path)))
}

/// Page path following the endpoint in a request path.
fn page_path(request_path: &str) -> &str {
    request_path
        .strip_prefix('/')
        .and_then(|path| path.strip_prefix(LIVE_PATCH_ENDPOINT))
        .filter(|page| page.starts_with('/'))
        .unwrap_or("/")
}

struct Subscription {
    page: String,
    receiver: PatchReceiver,
}

impl Subscription {
    /// Wait for the next message, `None` once the page was dropped.
    async fn next(&mut self) -> Option<PatchMessage> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }
}

async fn subscribe(state: &AppState, path: &str) -> Option<Subscription> {
    let Some(page) = state.page_key(path).await else {
        tracing::debug!(path, "Ignoring subscription to invalid path");
        return None;
    };
    let receiver = state.registry.subscribe(&page);
    tracing::debug!(%page, "Client subscribed");
    Some(Subscription { page, receiver })
}

async fn next_patch(subscription: &mut Option<Subscription>) -> Option<PatchMessage> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

/// Handle an established WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, path: Option<String>) {
    let mut subscription = match path {
        Some(path) => subscribe(&state, &path).await,
        None => None,
    };

    loop {
        tokio::select! {
            // Forward patches for the subscribed page
            patch = next_patch(&mut subscription) => {
                let Some(patch) = patch else {
                    break;
                };
                let reload = patch.is_reload();
                if socket.send(Message::Text(patch.as_text().to_owned().into())).await.is_err() {
                    break;
                }
                if let Some(subscription) = &subscription {
                    tracing::debug!(page = %subscription.page, reload, "Sent patch");
                }
            }
            // The client names (or renames) its page in text frames
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        let current = subscription.as_ref().map(|s| s.page.as_str());
                        let same_page = state.page_key(text.as_str()).await.as_deref() == current;
                        if !same_page && let Some(next) = subscribe(&state, text.as_str()).await {
                            subscription = Some(next);
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Client may already be gone
    let _ = socket.send(Message::Close(None)).await;
}
