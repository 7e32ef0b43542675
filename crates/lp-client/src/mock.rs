//! In-memory page for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lp_protocol::PageLocation;

use crate::{ClientError, Highlighter, Page};

#[derive(Debug, Default)]
struct MockState {
    anchor: Option<String>,
    last_selector: Option<String>,
    patches: usize,
    reloads: usize,
    load_events: usize,
}

/// Mock page recording everything the client does to it.
///
/// Starts with an empty content anchor. Any selector matches the anchor;
/// the last one used is recorded.
#[derive(Debug)]
pub struct MockPage {
    location: PageLocation,
    state: Mutex<MockState>,
}

impl MockPage {
    /// Create a page at `location` with an empty content anchor.
    #[must_use]
    pub fn new(location: PageLocation) -> Self {
        Self {
            location,
            state: Mutex::new(MockState {
                anchor: Some(String::new()),
                ..MockState::default()
            }),
        }
    }

    /// Remove the content anchor from the page.
    #[must_use]
    pub fn without_anchor(self) -> Self {
        self.state().anchor = None;
        self
    }

    /// Current inner HTML of the content anchor, `None` without an anchor.
    pub fn anchor_html(&self) -> Option<String> {
        self.state().anchor.clone()
    }

    /// Selector used by the last patch.
    pub fn last_selector(&self) -> Option<String> {
        self.state().last_selector.clone()
    }

    /// Number of successful content replacements.
    pub fn patch_count(&self) -> usize {
        self.state().patches
    }

    pub fn reload_count(&self) -> usize {
        self.state().reloads
    }

    pub fn load_event_count(&self) -> usize {
        self.state().load_events
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Page for MockPage {
    fn location(&self) -> PageLocation {
        self.location.clone()
    }

    fn reload(&self) {
        self.state().reloads += 1;
    }

    fn replace_content(&self, selector: &str, html: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        state.last_selector = Some(selector.to_owned());
        let Some(anchor) = state.anchor.as_mut() else {
            return Err(ClientError::MissingAnchor(selector.to_owned()));
        };
        html.clone_into(anchor);
        state.patches += 1;
        Ok(())
    }

    fn dispatch_load(&self) {
        self.state().load_events += 1;
    }
}

/// Highlighter counting its invocations. Clones share the counter.
#[derive(Clone, Debug, Default)]
pub struct MockHighlighter {
    calls: Arc<AtomicUsize>,
}

impl MockHighlighter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Highlighter for MockHighlighter {
    fn rehighlight(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}
