//! Capabilities the client needs from the page it runs in.

use lp_protocol::PageLocation;

use crate::ClientError;

/// The page a live-patch client keeps up to date.
///
/// Methods take `&self`: page implementations are driven from event
/// callbacks and use interior mutability where they hold state.
pub trait Page {
    /// Current location of the page.
    fn location(&self) -> PageLocation;

    /// Reload the whole page, discarding its current state.
    fn reload(&self);

    /// Replace the inner HTML of the element matching `selector` with `html`,
    /// verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingAnchor`] when no element matches.
    fn replace_content(&self, selector: &str, html: &str) -> Result<(), ClientError>;

    /// Dispatch a synthetic `load` event on the document.
    fn dispatch_load(&self);
}

/// Syntax highlighting re-run after every patch.
pub trait Highlighter {
    /// Highlight code blocks in freshly inserted content.
    fn rehighlight(&self);
}
