//! Store file watching.
//!
//! Watches the JSON store for changes made by another process (a second
//! server, the CLI, or a hand edit) and triggers a reload callback. Bursts of
//! events from the temp-file-and-rename write are collapsed by a debouncer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Configuration for store watching and reload retries.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Minimum time between callbacks (default: 2 seconds).
    pub debounce_duration: Duration,
    /// Number of reload attempts (default: 3).
    pub retry_attempts: u32,
    /// Delay between reload attempts (default: 500ms).
    pub retry_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_secs(2),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    Notify(#[from] notify::Error),

    #[error("Store directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Store path has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Collapses rapid events into one callback per window.
struct Debouncer {
    last_triggered: Option<Instant>,
    duration: Duration,
}

impl Debouncer {
    fn new(duration: Duration) -> Self {
        Self {
            last_triggered: None,
            duration,
        }
    }

    /// Returns true (and starts a new window) if the last window has passed.
    fn should_trigger(&mut self) -> bool {
        let now = Instant::now();
        let ready = self
            .last_triggered
            .is_none_or(|last| now.duration_since(last) >= self.duration);
        if ready {
            self.last_triggered = Some(now);
        }
        ready
    }

    /// Restarts the window without triggering.
    fn reset(&mut self) {
        self.last_triggered = Some(Instant::now());
    }
}

/// True when `event` creates, modifies or removes the store file itself.
///
/// Events for the `.tmp` sibling are ignored; the rename that follows
/// reports the store file.
fn is_store_event(event: &Event, file_name: &OsString) -> bool {
    let touches_store = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()));
    touches_store
        && matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        )
}

/// Watches the store file and calls `on_change` after it changes.
///
/// The file does not need to exist yet; its directory does. Returns only
/// when the event channel closes.
pub async fn watch_store<F>(
    path: impl AsRef<Path>,
    config: WatcherConfig,
    on_change: F,
) -> Result<(), WatcherError>
where
    F: Fn() + Send + Sync + 'static,
{
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|s| s.to_owned())
        .ok_or_else(|| WatcherError::NoFileName(path.to_path_buf()))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let watch_dir = parent
        .canonicalize()
        .map_err(|_| WatcherError::DirectoryNotFound(parent.to_path_buf()))?;

    log::info!("Watching store: {}", path.display());
    log::debug!("Watch directory: {}", watch_dir.display());

    let (tx, mut rx) = mpsc::channel::<Event>(100);
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            if let Ok(event) = result {
                // Drop events when the channel is full
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default(),
    )?;
    // The directory, not the file: renames replace the inode
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    let on_change = Arc::new(on_change);
    let debouncer = Arc::new(Mutex::new(Debouncer::new(config.debounce_duration)));
    let pending = Arc::new(Mutex::new(false));

    // Fires the trailing callback for events swallowed by the debouncer
    let timer_debouncer = debouncer.clone();
    let timer_on_change = on_change.clone();
    let timer_pending = pending.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;

            let mut pending = timer_pending.lock().await;
            if *pending && timer_debouncer.lock().await.should_trigger() {
                *pending = false;
                drop(pending);
                log::info!("Debounced store change, reloading");
                timer_on_change();
            }
        }
    });

    while let Some(event) = rx.recv().await {
        if !is_store_event(&event, &file_name) {
            continue;
        }
        log::debug!("Store event: {:?}", event.kind);

        let mut db = debouncer.lock().await;
        if db.should_trigger() {
            drop(db);
            log::info!("Store changed, reloading");
            on_change();
        } else {
            db.reset();
            drop(db);
            *pending.lock().await = true;
        }
    }

    Err(WatcherError::ChannelClosed)
}
