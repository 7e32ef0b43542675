//! Client behaviour options.

use serde::{Deserialize, Serialize};

/// What the client does when the socket closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosePolicy {
    /// Leave the page as it is.
    #[default]
    Ignore,
    /// Reload the page, treating the disconnect as stale state.
    Reload,
}

/// Options controlling a live-patch client.
///
/// Serialized as a JSON object into the client script served to browsers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Append the page path to the socket endpoint.
    pub append_page_path: bool,
    /// Send the page path as the first frame after connecting.
    pub send_path_on_open: bool,
    /// Behaviour on socket close.
    pub close_policy: ClosePolicy,
    /// Close the socket when the page unloads.
    pub close_on_unload: bool,
    /// CSS selector of the content anchor.
    pub content_selector: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            append_page_path: true,
            send_path_on_open: true,
            close_policy: ClosePolicy::Ignore,
            close_on_unload: true,
            content_selector: "main".to_owned(),
        }
    }
}
