//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use lp_protocol::{CLIENT_SCRIPT_PATH, LIVE_PATCH_ENDPOINT};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::live_patch;
use crate::middleware::headers;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    // WebSocket and client script for live patching
    if state.live_patch_enabled() {
        let endpoint = format!("/{LIVE_PATCH_ENDPOINT}");
        router = router
            .route(&endpoint, get(live_patch::ws_handler))
            .route(&format!("{endpoint}/"), get(live_patch::ws_page_handler))
            .route(&format!("{endpoint}/{{*path}}"), get(live_patch::ws_page_handler))
            .route(CLIENT_SCRIPT_PATH, get(static_files::client_script));
    }

    // Build directory
    router = router.merge(static_files::static_router());

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(headers::content_type_options_layer())
                .layer(headers::cache_control_layer()),
        )
        .with_state(state)
}
