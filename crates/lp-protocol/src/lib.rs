//! Wire contract for livepatch.
//!
//! Shared by the browser client, the native client runner and the preview
//! server:
//!
//! - the well-known WebSocket endpoint and client script paths
//! - [`PatchMessage`], the text frames pushed from server to client
//! - [`PageLocation`], from which the client derives its socket address
//! - [`ClientOptions`], the knobs the server hands to every client
//!
//! # Protocol
//!
//! ```text
//! client                                   server
//!   │── GET /__mdbook_incremental_preview_live_patch/<page> (upgrade) ──►│
//!   │── text: "<page path>" ───────────────────────────────────────────►│
//!   │◄── text: "<p>fresh html</p>" ─────────────────────────────────────│
//!   │◄── text: "__RELOAD" ──────────────────────────────────────────────│
//! ```

mod location;
mod message;
mod options;

pub use location::{PageLocation, Scheme};
pub use message::PatchMessage;
pub use options::{ClientOptions, ClosePolicy};

/// WebSocket endpoint, without the leading slash.
pub const LIVE_PATCH_ENDPOINT: &str = "__mdbook_incremental_preview_live_patch";

/// HTTP path the client script is served from.
pub const CLIENT_SCRIPT_PATH: &str = "/__mdbook_incremental_preview_live_patch.js";

/// Payload telling the client to reload the whole page.
pub const RELOAD_SENTINEL: &str = "__RELOAD";

/// Protocol error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// URL does not use `http://` or `https://`.
    #[error("Unsupported page scheme in {0:?}, expected http or https")]
    UnsupportedScheme(String),
    /// URL has no host component.
    #[error("Page URL {0:?} has no host")]
    MissingHost(String),
    /// URL cannot be parsed.
    #[error("Invalid page URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
