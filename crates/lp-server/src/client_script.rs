//! Client script served to preview pages.
//!
//! The script is a plain-JavaScript rendition of the `lp-client` core, so
//! pages work without loading a wasm bundle.

use lp_protocol::{ClientOptions, LIVE_PATCH_ENDPOINT, RELOAD_SENTINEL};

const TEMPLATE: &str = include_str!("../assets/live_patch.js");

/// Render the client script with `options` baked in.
pub(crate) fn render(options: &ClientOptions) -> Result<String, serde_json::Error> {
    let options = serde_json::to_string(options)?;
    Ok(TEMPLATE
        .replace("__LIVE_PATCH_OPTIONS__", &options)
        .replace("__LIVE_PATCH_ENDPOINT__", LIVE_PATCH_ENDPOINT)
        .replace("__RELOAD_SENTINEL__", RELOAD_SENTINEL))
}
