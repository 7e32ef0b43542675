//! Registry of patches per page.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lp_protocol::PatchMessage;
use tokio::sync::watch;

/// Receiver of the latest message for one page. `None` until the first one.
pub type PatchReceiver = watch::Receiver<Option<PatchMessage>>;

/// Watch channels of the latest patch for each page key.
///
/// A page gets an entry when a client subscribes to it or when a patch is
/// published for it. Reloading a page drops its entry, which ends the
/// subscriptions after they see the reload.
#[derive(Debug, Default)]
pub struct PatchRegistry {
    pages: Mutex<HashMap<String, watch::Sender<Option<PatchMessage>>>>,
}

impl PatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to patches for `page`.
    ///
    /// The current value counts as seen; only later messages are delivered.
    pub fn subscribe(&self, page: &str) -> PatchReceiver {
        self.pages()
            .entry(page.to_owned())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Publish new HTML for `page`.
    ///
    /// Subscribers are only notified when the HTML differs from the last one
    /// published. Returns whether any subscriber was notified.
    pub fn publish(&self, page: &str, html: String) -> bool {
        let mut pages = self.pages();
        match pages.entry(page.to_owned()) {
            Entry::Occupied(entry) => {
                let sender = entry.get();
                let changed = sender.send_if_modified(|current| {
                    if matches!(current, Some(PatchMessage::Replace(old)) if *old == html) {
                        return false;
                    }
                    *current = Some(PatchMessage::Replace(html));
                    true
                });
                if !changed {
                    tracing::debug!(page, "Patch unchanged");
                }
                changed && sender.receiver_count() > 0
            }
            Entry::Vacant(entry) => {
                entry.insert(watch::channel(Some(PatchMessage::Replace(html))).0);
                false
            }
        }
    }

    /// Tell subscribers of `page` to reload and forget the page.
    ///
    /// Returns whether the page had subscribers.
    pub fn reload_page(&self, page: &str) -> bool {
        let Some(sender) = self.pages().remove(page) else {
            return false;
        };
        sender.send_replace(Some(PatchMessage::Reload));
        sender.receiver_count() > 0
    }

    /// Tell every subscriber to reload and empty the registry.
    ///
    /// Returns the number of pages that were registered.
    pub fn reload_all(&self) -> usize {
        let drained: Vec<_> = self.pages().drain().collect();
        for (_, sender) in &drained {
            sender.send_replace(Some(PatchMessage::Reload));
        }
        drained.len()
    }

    /// Forget every page, ending all subscriptions without a message.
    pub fn clear(&self) {
        self.pages().clear();
    }

    /// Whether `page` has an entry.
    pub fn contains(&self, page: &str) -> bool {
        self.pages().contains_key(page)
    }

    /// Number of open subscriptions to `page`.
    pub fn subscriber_count(&self, page: &str) -> usize {
        self.pages()
            .get(page)
            .map_or(0, watch::Sender::receiver_count)
    }

    /// Number of pages with an entry.
    pub fn len(&self) -> usize {
        self.pages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages().is_empty()
    }

    fn pages(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<Option<PatchMessage>>>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
