//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::live_patch::PatchRegistry;
use crate::pages;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Directory of rendered HTML.
    pub(crate) build_dir: PathBuf,
    /// Patches per page.
    pub(crate) registry: Arc<PatchRegistry>,
    /// Rendered client script (`None` when live patching is disabled).
    pub(crate) client_script: Option<String>,
}

impl AppState {
    /// Check if live patching is enabled.
    #[must_use]
    pub(crate) fn live_patch_enabled(&self) -> bool {
        self.client_script.is_some()
    }

    /// Registry key for a page path sent by a client.
    ///
    /// Prefers the file that would be served for the path, falling back to
    /// the conventional key when nothing exists yet.
    pub(crate) async fn page_key(&self, path: &str) -> Option<String> {
        match pages::resolve(&self.build_dir, path).await {
            Some((key, _)) => Some(key),
            None => pages::page_key(path),
        }
    }
}
