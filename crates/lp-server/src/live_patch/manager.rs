//! Live patch manager.
//!
//! Watches the build directory and turns rendered pages into patches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::debouncer::{EventDebouncer, FsEvent, FsEventKind};
use super::extract::extract_main;
use super::registry::PatchRegistry;
use crate::error::ServerError;
use crate::pages;

/// Default debounce duration in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// How often debounced events are drained.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const DEFAULT_PATTERNS: [&str; 3] = ["**/*.html", "**/*.css", "**/*.js"];

/// Watches the build directory and publishes patches to the registry.
pub(crate) struct LivePatchManager {
    build_dir: PathBuf,
    patterns: Vec<glob::Pattern>,
    registry: Arc<PatchRegistry>,
    debounce_ms: u64,
    watcher: Option<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl LivePatchManager {
    /// Create a new live patch manager.
    ///
    /// # Arguments
    ///
    /// * `build_dir` - Directory of rendered HTML to watch
    /// * `watch_patterns` - Glob patterns to match (default: HTML, CSS and JS)
    /// * `registry` - Registry patches are published to
    pub(crate) fn new(
        build_dir: PathBuf,
        watch_patterns: Option<Vec<String>>,
        registry: Arc<PatchRegistry>,
    ) -> Result<Self, ServerError> {
        let patterns = watch_patterns
            .unwrap_or_else(|| DEFAULT_PATTERNS.map(str::to_owned).to_vec())
            .into_iter()
            .map(|pattern| {
                glob::Pattern::new(&pattern)
                    .map_err(|source| ServerError::Pattern { pattern, source })
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            build_dir,
            patterns,
            registry,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            watcher: None,
            tasks: Vec::new(),
        })
    }

    /// Set the debounce duration in milliseconds.
    #[must_use]
    pub(crate) fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Start the file watcher.
    ///
    /// Spawns a task recording raw events into the debouncer and a task
    /// turning debounced events into patches.
    pub(crate) fn start(&mut self) -> Result<(), ServerError> {
        // notify reports canonical paths
        let build_dir = self.build_dir.canonicalize()?;
        let gitignore = load_gitignore(&build_dir);

        let (tx, mut rx) = mpsc::channel::<Event>(100);
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                // Callback is sync
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(err) => tracing::warn!(%err, "File watcher error"),
            }
        })?;
        watcher.watch(&build_dir, RecursiveMode::Recursive)?;
        self.watcher = Some(watcher);

        let debouncer = Arc::new(EventDebouncer::new(Duration::from_millis(self.debounce_ms)));

        let recorder = Arc::clone(&debouncer);
        let patterns = self.patterns.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                record_event(&event, &build_dir, &patterns, &gitignore, &recorder);
            }
        }));

        let registry = Arc::clone(&self.registry);
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                for fs_event in debouncer.drain_ready() {
                    handle_fs_event(&fs_event, &registry).await;
                }
            }
        }));

        tracing::info!(dir = %self.build_dir.display(), "Watching build directory");
        Ok(())
    }
}

impl Drop for LivePatchManager {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn load_gitignore(build_dir: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(build_dir);
    let file = build_dir.join(".gitignore");
    if file.is_file()
        && let Some(err) = builder.add(&file)
    {
        tracing::warn!(%err, "Ignoring invalid .gitignore");
    }
    builder.build().unwrap_or_else(|err| {
        tracing::warn!(%err, "Ignoring invalid .gitignore");
        Gitignore::empty()
    })
}

/// Record a raw filesystem event into the debouncer.
fn record_event(
    event: &Event,
    build_dir: &Path,
    patterns: &[glob::Pattern],
    gitignore: &Gitignore,
    debouncer: &EventDebouncer,
) {
    let (kind, created) = match event.kind {
        EventKind::Create(_) => (FsEventKind::Changed, true),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
            (FsEventKind::Removed, false)
        }
        EventKind::Modify(_) => (FsEventKind::Changed, false),
        _ => return,
    };

    for path in &event.paths {
        if !matches_patterns(path, build_dir, patterns) {
            continue;
        }
        if gitignore
            .matched_path_or_any_parents(path, path.is_dir())
            .is_ignore()
        {
            continue;
        }
        let Some(page) = pages::key_for_file(path, build_dir) else {
            continue;
        };

        tracing::debug!(%page, ?kind, created, "Recorded filesystem event");
        if created {
            debouncer.record_created(page, path.clone());
        } else {
            debouncer.record(page, path.clone(), kind);
        }
    }
}

/// Check if a path inside the build directory matches any watch pattern.
fn matches_patterns(path: &Path, build_dir: &Path, patterns: &[glob::Pattern]) -> bool {
    let Ok(relative) = path.strip_prefix(build_dir) else {
        return false;
    };
    let relative = relative.to_string_lossy();
    patterns.iter().any(|pattern| pattern.matches(&relative))
}

/// Turn a debounced filesystem event into registry updates.
async fn handle_fs_event(fs_event: &FsEvent, registry: &PatchRegistry) {
    let start = Instant::now();
    let page = fs_event.page.as_str();

    if !pages::is_html(page) {
        let reloaded = registry.reload_all();
        tracing::info!(path = %page, reloaded, "Asset changed, reloading all pages");
        return;
    }

    let patched = match fs_event.kind {
        FsEventKind::Removed => {
            registry.reload_page(page);
            false
        }
        FsEventKind::Changed => {
            match tokio::fs::read_to_string(&fs_event.path).await {
                Ok(html) => {
                    if let Some(main) = extract_main(&html) {
                        registry.publish(page, main.to_owned())
                    } else {
                        tracing::warn!(%page, "No <main> element, reloading page");
                        registry.reload_page(page);
                        false
                    }
                }
                Err(err) => {
                    tracing::warn!(%page, %err, "Cannot read page, reloading");
                    registry.reload_page(page);
                    false
                }
            }
        }
    };

    tracing::info!(
        %page,
        kind = ?fs_event.kind,
        patched,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Live patch event processed"
    );
}
