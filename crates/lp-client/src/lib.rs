//! Live-patch client for livepatch preview pages.
//!
//! The client keeps a page in sync with the preview server over a single
//! WebSocket. Each text frame either replaces the page's content anchor
//! (the `<main>` element by default) or, for the `__RELOAD` sentinel, reloads
//! the whole page.
//!
//! The core, [`LivePatchClient`], is platform-neutral: it talks to the page
//! through the [`Page`] trait and leaves socket I/O to a driver.
//!
//! - `web` (wasm32 only): drives the core from `web_sys::WebSocket` callbacks
//!   against the real DOM.
//! - `native` (feature `native`): drives the core from a `tokio-tungstenite`
//!   connection, used by `lp watch` and end-to-end tests.
//! - `mock` (feature `mock`): an in-memory [`MockPage`] for tests.
//!
//! # Example
//!
//! ```ignore
//! use lp_client::{LivePatchClient, MockPage};
//! use lp_protocol::{ClientOptions, PageLocation};
//!
//! let location = PageLocation::parse("http://localhost:3000/chapter1")?;
//! let client = LivePatchClient::new(MockPage::new(location), ClientOptions::default());
//!
//! client.on_message("<p>Hello</p>")?;
//! assert_eq!(client.page().anchor_html().as_deref(), Some("<p>Hello</p>"));
//! ```

mod client;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "native")]
pub mod native;
mod page;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use client::{CloseOutcome, LivePatchClient, PatchOutcome};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockHighlighter, MockPage};
pub use page::{Highlighter, Page};

/// Client error.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No element matches the content selector.
    #[error("Content anchor not found for selector {0:?}")]
    MissingAnchor(String),
    /// The page rejected a DOM operation.
    #[error("DOM error: {0}")]
    Dom(String),
    /// WebSocket transport failure.
    #[cfg(feature = "native")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
