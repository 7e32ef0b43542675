//! Live-patch client core.

use lp_protocol::{ClientOptions, ClosePolicy, PatchMessage};

use crate::{ClientError, Highlighter, Page};

/// Result of handling one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The content anchor was replaced.
    Patched,
    /// A full page reload was requested.
    Reloaded,
}

/// Result of handling a socket close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    Ignored,
    Reloaded,
}

/// Keeps one page in sync with the preview server.
///
/// Holds no socket: drivers open the socket at [`socket_url`](Self::socket_url),
/// send what [`on_open`](Self::on_open) returns, feed every text frame to
/// [`on_message`](Self::on_message), and report close and unload events.
pub struct LivePatchClient<P> {
    page: P,
    options: ClientOptions,
    highlighter: Option<Box<dyn Highlighter>>,
}

impl<P: Page> LivePatchClient<P> {
    /// Create a client for `page`.
    #[must_use]
    pub fn new(page: P, options: ClientOptions) -> Self {
        Self {
            page,
            options,
            highlighter: None,
        }
    }

    /// Register a highlighter re-run after every patch.
    #[must_use]
    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Some(Box::new(highlighter));
        self
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// WebSocket address to connect to, derived from the page location.
    #[must_use]
    pub fn socket_url(&self) -> String {
        self.page
            .location()
            .socket_url(self.options.append_page_path)
    }

    /// Frame to send once the socket is open, if any.
    ///
    /// This is the page path, letting the server know which page to watch.
    #[must_use]
    pub fn on_open(&self) -> Option<String> {
        if !self.options.send_path_on_open {
            return None;
        }
        let location = self.page.location();
        tracing::debug!(path = location.path(), "Live patch connected");
        Some(location.path().to_owned())
    }

    /// Handle a text frame from the server.
    ///
    /// The sentinel reloads the page and leaves the document untouched.
    /// Any other payload replaces the content anchor verbatim, then the
    /// `load` event is dispatched and the highlighter re-run.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingAnchor`] when the page has no content
    /// anchor; nothing else happens for that message.
    pub fn on_message(&self, payload: &str) -> Result<PatchOutcome, ClientError> {
        let html = match PatchMessage::from_text(payload) {
            PatchMessage::Reload => {
                tracing::info!("Reloading page");
                self.page.reload();
                return Ok(PatchOutcome::Reloaded);
            }
            PatchMessage::Replace(html) => html,
        };

        let selector = &self.options.content_selector;
        if let Err(err) = self.page.replace_content(selector, &html) {
            tracing::warn!(%err, "Cannot patch page");
            return Err(err);
        }
        tracing::debug!(len = html.len(), "Patched page content");

        self.page.dispatch_load();
        if let Some(highlighter) = &self.highlighter {
            highlighter.rehighlight();
        }
        Ok(PatchOutcome::Patched)
    }

    /// Handle the socket closing.
    pub fn on_close(&self) -> CloseOutcome {
        match self.options.close_policy {
            ClosePolicy::Ignore => {
                tracing::debug!("Live patch socket closed");
                CloseOutcome::Ignored
            }
            ClosePolicy::Reload => {
                tracing::info!("Live patch socket closed, reloading page");
                self.page.reload();
                CloseOutcome::Reloaded
            }
        }
    }

    /// Handle the page unloading. Returns whether the socket should be closed.
    #[must_use]
    pub fn on_unload(&self) -> bool {
        self.options.close_on_unload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockHighlighter, MockPage};
    use lp_protocol::PageLocation;
    use pretty_assertions::assert_eq;

    fn page(url: &str) -> MockPage {
        MockPage::new(PageLocation::parse(url).unwrap())
    }

    fn client(url: &str) -> LivePatchClient<MockPage> {
        LivePatchClient::new(page(url), ClientOptions::default())
    }

    #[test]
    fn test_socket_url_appends_page_path() {
        let client = client("http://localhost:3000/chapter1");
        assert_eq!(
            client.socket_url(),
            "ws://localhost:3000/__mdbook_incremental_preview_live_patch/chapter1"
        );
    }

    #[test]
    fn test_socket_url_without_page_path() {
        let options = ClientOptions {
            append_page_path: false,
            ..ClientOptions::default()
        };
        let client = LivePatchClient::new(page("https://docs.example.com/guide"), options);
        assert_eq!(
            client.socket_url(),
            "wss://docs.example.com/__mdbook_incremental_preview_live_patch"
        );
    }

    #[test]
    fn test_on_open_sends_page_path() {
        let client = client("http://localhost:3000/guide/intro.html");
        assert_eq!(client.on_open().as_deref(), Some("/guide/intro.html"));
    }

    #[test]
    fn test_on_open_sends_nothing_when_disabled() {
        let options = ClientOptions {
            send_path_on_open: false,
            ..ClientOptions::default()
        };
        let client = LivePatchClient::new(page("http://localhost:3000/"), options);
        assert_eq!(client.on_open(), None);
    }

    #[test]
    fn test_message_replaces_anchor_verbatim() {
        let client = client("http://localhost:3000/chapter1");

        let outcome = client.on_message("<p>Hello</p>").unwrap();

        assert_eq!(outcome, PatchOutcome::Patched);
        assert_eq!(client.page().anchor_html().as_deref(), Some("<p>Hello</p>"));
        assert_eq!(client.page().reload_count(), 0);
    }

    #[test]
    fn test_message_is_not_sanitized() {
        let client = client("http://localhost:3000/");
        let payload = "<script>alert(1)</script><img src=x onerror=y>  \n";

        client.on_message(payload).unwrap();

        assert_eq!(client.page().anchor_html().as_deref(), Some(payload));
    }

    #[test]
    fn test_every_patch_dispatches_load() {
        let client = client("http://localhost:3000/");

        client.on_message("<p>one</p>").unwrap();
        client.on_message("<p>two</p>").unwrap();

        assert_eq!(client.page().load_event_count(), 2);
        assert_eq!(client.page().anchor_html().as_deref(), Some("<p>two</p>"));
    }

    #[test]
    fn test_sentinel_reloads_without_touching_document() {
        let client = client("http://localhost:3000/").with_highlighter(MockHighlighter::new());
        client.on_message("<p>before</p>").unwrap();

        let outcome = client.on_message("__RELOAD").unwrap();

        assert_eq!(outcome, PatchOutcome::Reloaded);
        assert_eq!(client.page().reload_count(), 1);
        assert_eq!(client.page().anchor_html().as_deref(), Some("<p>before</p>"));
        assert_eq!(client.page().patch_count(), 1);
        assert_eq!(client.page().load_event_count(), 1);
    }

    #[test]
    fn test_frames_decode_like_server_messages() {
        let client = client("http://localhost:3000/");

        for frame in [PatchMessage::Replace(" __RELOAD".to_owned()), PatchMessage::Reload] {
            let outcome = client.on_message(frame.as_text()).unwrap();
            assert_eq!(outcome == PatchOutcome::Reloaded, frame.is_reload());
        }

        assert_eq!(client.page().anchor_html().as_deref(), Some(" __RELOAD"));
        assert_eq!(client.page().reload_count(), 1);
    }

    #[test]
    fn test_highlighter_runs_after_patch() {
        let highlighter = MockHighlighter::new();
        let client = client("http://localhost:3000/").with_highlighter(highlighter.clone());

        client.on_message("<pre><code>fn main() {}</code></pre>").unwrap();
        client.on_message("__RELOAD").unwrap();

        assert_eq!(highlighter.calls(), 1);
    }

    #[test]
    fn test_missing_anchor_is_an_error() {
        let client = LivePatchClient::new(
            page("http://localhost:3000/").without_anchor(),
            ClientOptions::default(),
        );

        let err = client.on_message("<p>Hello</p>").unwrap_err();

        assert!(matches!(err, ClientError::MissingAnchor(ref s) if s == "main"));
        assert_eq!(client.page().load_event_count(), 0);
    }

    #[test]
    fn test_custom_content_selector() {
        let options = ClientOptions {
            content_selector: "#content".to_owned(),
            ..ClientOptions::default()
        };
        let client = LivePatchClient::new(page("http://localhost:3000/"), options);

        client.on_message("<p>x</p>").unwrap();

        assert_eq!(client.page().last_selector().as_deref(), Some("#content"));
    }

    #[test]
    fn test_close_ignored_by_default() {
        let client = client("http://localhost:3000/");
        assert_eq!(client.on_close(), CloseOutcome::Ignored);
        assert_eq!(client.page().reload_count(), 0);
    }

    #[test]
    fn test_close_reloads_once_per_close_event() {
        let options = ClientOptions {
            close_policy: ClosePolicy::Reload,
            ..ClientOptions::default()
        };
        let client = LivePatchClient::new(page("http://localhost:3000/"), options);

        assert_eq!(client.on_close(), CloseOutcome::Reloaded);
        assert_eq!(client.page().reload_count(), 1);

        assert_eq!(client.on_close(), CloseOutcome::Reloaded);
        assert_eq!(client.page().reload_count(), 2);
    }

    #[test]
    fn test_unload_closes_socket_when_enabled() {
        let client = client("http://localhost:3000/");
        assert!(client.on_unload());

        let options = ClientOptions {
            close_on_unload: false,
            ..ClientOptions::default()
        };
        let client = LivePatchClient::new(page("http://localhost:3000/"), options);
        assert!(!client.on_unload());
    }
}
