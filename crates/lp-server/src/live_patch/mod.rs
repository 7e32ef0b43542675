//! Live patching: patch registry, WebSocket endpoint and file watcher.

mod debouncer;
mod extract;
mod manager;
mod registry;
mod websocket;

pub(crate) use manager::LivePatchManager;
pub use registry::PatchRegistry;
pub(crate) use websocket::{ws_handler, ws_page_handler};
