//! Server-to-client patch messages.

use std::fmt;

use crate::RELOAD_SENTINEL;

/// A text frame sent from the server to a live-patch client.
///
/// Frames are opaque text: the sentinel means "reload the page", anything
/// else is an HTML fragment that replaces the content anchor verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchMessage {
    /// Reload the whole page.
    Reload,
    /// Replace the content anchor with this HTML.
    Replace(String),
}

impl PatchMessage {
    /// Interpret a received text frame.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if text == RELOAD_SENTINEL {
            Self::Reload
        } else {
            Self::Replace(text.to_owned())
        }
    }

    /// Text of the frame to send.
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Reload => RELOAD_SENTINEL,
            Self::Replace(html) => html,
        }
    }

    /// Whether this message requests a full reload.
    #[must_use]
    pub fn is_reload(&self) -> bool {
        matches!(self, Self::Reload)
    }
}

impl fmt::Display for PatchMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}
