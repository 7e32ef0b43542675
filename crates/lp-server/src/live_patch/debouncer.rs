//! Event debouncing for the build directory watcher.
//!
//! Renderers usually write a page several times per rebuild (truncate, write,
//! rename over). Events are coalesced per page key so each page is patched
//! once.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// What happened to a page's file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum FsEventKind {
    /// The file exists with new content.
    Changed,
    /// The file is gone.
    Removed,
}

/// A debounced event for one page.
#[derive(Clone, Debug)]
pub(super) struct FsEvent {
    pub page: String,
    pub path: PathBuf,
    pub kind: FsEventKind,
}

struct PendingEvent {
    path: PathBuf,
    kind: FsEventKind,
    /// The file did not exist before this window.
    created: bool,
    deadline: Instant,
}

/// Thread-safe event debouncer.
pub(super) struct EventDebouncer {
    pending: Mutex<HashMap<String, PendingEvent>>,
    debounce_duration: Duration,
}

impl EventDebouncer {
    pub fn new(debounce_duration: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            debounce_duration,
        }
    }

    /// Record a change or removal of `page`, pushing back its deadline.
    pub fn record(&self, page: String, path: PathBuf, kind: FsEventKind) {
        self.insert(page, path, kind, false);
    }

    /// Record the creation of `page`'s file.
    ///
    /// A page created and removed within one window is never reported.
    pub fn record_created(&self, page: String, path: PathBuf) {
        self.insert(page, path, FsEventKind::Changed, true);
    }

    fn insert(&self, page: String, path: PathBuf, kind: FsEventKind, created: bool) {
        let mut pending = self.pending();
        let deadline = Instant::now() + self.debounce_duration;

        match pending.entry(page) {
            Entry::Vacant(entry) => {
                entry.insert(PendingEvent {
                    path,
                    kind,
                    created,
                    deadline,
                });
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get();
                if existing.created && kind == FsEventKind::Removed {
                    entry.remove();
                    return;
                }
                // Only a page first seen as created keeps the flag
                let created = existing.created && kind == FsEventKind::Changed;
                *entry.get_mut() = PendingEvent {
                    path,
                    kind,
                    created,
                    deadline,
                };
            }
        }
    }

    /// Take the events whose deadline has passed.
    pub fn drain_ready(&self) -> Vec<FsEvent> {
        let mut pending = self.pending();
        let now = Instant::now();

        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, event)| event.deadline <= now)
            .map(|(page, _)| page.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|page| {
                let event = pending.remove(&page)?;
                Some(FsEvent {
                    page,
                    path: event.path,
                    kind: event.kind,
                })
            })
            .collect()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingEvent>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn drain_after_deadline(debouncer: &EventDebouncer) -> Vec<FsEvent> {
        thread::sleep(Duration::from_millis(15));
        debouncer.drain_ready()
    }

    #[test]
    fn test_single_event_emitted_after_deadline() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/book/chapter1.html");

        debouncer.record("chapter1.html".to_owned(), path.clone(), FsEventKind::Changed);

        assert!(debouncer.drain_ready().is_empty());

        let events = drain_after_deadline(&debouncer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].page, "chapter1.html");
        assert_eq!(events[0].path, path);
        assert_eq!(events[0].kind, FsEventKind::Changed);

        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_rebuild_writes_coalesce() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/book/chapter1.html");

        debouncer.record_created("chapter1.html".to_owned(), path.clone());
        debouncer.record("chapter1.html".to_owned(), path.clone(), FsEventKind::Changed);
        debouncer.record("chapter1.html".to_owned(), path, FsEventKind::Changed);

        let events = drain_after_deadline(&debouncer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FsEventKind::Changed);
    }

    #[test]
    fn test_created_then_removed_is_dropped() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/book/draft.html");

        debouncer.record_created("draft.html".to_owned(), path.clone());
        debouncer.record("draft.html".to_owned(), path, FsEventKind::Removed);

        assert!(drain_after_deadline(&debouncer).is_empty());
    }

    #[test]
    fn test_changed_then_removed_is_removed() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/book/chapter1.html");

        debouncer.record("chapter1.html".to_owned(), path.clone(), FsEventKind::Changed);
        debouncer.record("chapter1.html".to_owned(), path, FsEventKind::Removed);

        let events = drain_after_deadline(&debouncer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FsEventKind::Removed);
    }

    #[test]
    fn test_rename_over_page_is_one_change() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/book/chapter1.html");

        // Old file moved away, new file moved into place
        debouncer.record("chapter1.html".to_owned(), path.clone(), FsEventKind::Removed);
        debouncer.record_created("chapter1.html".to_owned(), path.clone());

        let events = drain_after_deadline(&debouncer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FsEventKind::Changed);
        assert_eq!(events[0].path, path);
    }

    #[test]
    fn test_replaced_page_is_not_dropped_on_later_removal() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));
        let path = PathBuf::from("/book/chapter1.html");

        debouncer.record("chapter1.html".to_owned(), path.clone(), FsEventKind::Removed);
        debouncer.record_created("chapter1.html".to_owned(), path.clone());
        debouncer.record("chapter1.html".to_owned(), path, FsEventKind::Removed);

        let events = drain_after_deadline(&debouncer);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, FsEventKind::Removed);
    }

    #[test]
    fn test_pages_independent() {
        let debouncer = EventDebouncer::new(Duration::from_millis(10));

        debouncer.record(
            "a.html".to_owned(),
            PathBuf::from("/book/a.html"),
            FsEventKind::Changed,
        );
        debouncer.record_created("b.html".to_owned(), PathBuf::from("/book/b.html"));

        assert_eq!(drain_after_deadline(&debouncer).len(), 2);
    }
}
