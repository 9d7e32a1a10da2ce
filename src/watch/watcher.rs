// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use crate::errors::{FlowrunError, Result};
use crate::watch::ignore::IgnoreMatcher;

/// Interval over which raw filesystem events are coalesced into one batch.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Capacity of the batch channel handed to the driver.
pub const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Paths changed within one polling interval, relative to the watch root,
/// sorted and de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub paths: Vec<PathBuf>,
}

impl ChangeBatch {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let set: BTreeSet<PathBuf> = paths.into_iter().map(Into::into).collect();
        Self {
            paths: set.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub root: PathBuf,
    pub recursive: bool,
    pub poll_interval: Duration,
}

impl WatchOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Source of change batches for the watch driver.
pub trait ChangeWatcher: Send {
    /// Start watching. Batches arrive on the returned receiver until the
    /// watcher is stopped, at which point the channel closes.
    fn start(&mut self) -> Result<mpsc::Receiver<ChangeBatch>>;

    /// Stop watching. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

impl<W: ChangeWatcher + ?Sized> ChangeWatcher for Box<W> {
    fn start(&mut self) -> Result<mpsc::Receiver<ChangeBatch>> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }
}

struct Running {
    // Dropping the notify watcher ends the raw event stream.
    _watcher: RecommendedWatcher,
    batcher: JoinHandle<()>,
}

/// `notify`-backed [`ChangeWatcher`] over a directory tree.
pub struct FolderWatcher {
    options: WatchOptions,
    ignore: Arc<IgnoreMatcher>,
    running: Option<Running>,
}

impl std::fmt::Debug for FolderWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderWatcher")
            .field("options", &self.options)
            .field("running", &self.running.is_some())
            .finish()
    }
}

impl FolderWatcher {
    pub fn new(options: WatchOptions, ignore: IgnoreMatcher) -> Self {
        Self {
            options,
            ignore: Arc::new(ignore),
            running: None,
        }
    }
}

impl ChangeWatcher for FolderWatcher {
    fn start(&mut self) -> Result<mpsc::Receiver<ChangeBatch>> {
        if self.running.is_some() {
            return Err(FlowrunError::Config("watcher already running".into()));
        }

        let root = self.options.root.clone();
        // Canonicalize once so event paths can be made relative.
        let root = root.canonicalize().unwrap_or(root);

        // Channel from the blocking notify callback into the async world.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver is gone only after stop(); nothing to report.
                let _ = raw_tx.send(res);
            },
            Config::default(),
        )?;

        let mode = if self.options.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&root, mode)?;
        info!(root = ?root, interval = ?self.options.poll_interval, "file watcher started");

        let (batch_tx, batch_rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let batcher = tokio::spawn(
            batch_events(
                root,
                Arc::clone(&self.ignore),
                self.options.poll_interval,
                raw_rx,
                batch_tx,
            )
            .with_current_subscriber(),
        );

        self.running = Some(Running {
            _watcher: watcher,
            batcher,
        });
        Ok(batch_rx)
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.batcher.abort();
            debug!(root = ?self.options.root, "file watcher stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.batcher.is_finished())
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Collect raw events and emit one batch per interval that saw changes.
async fn batch_events(
    root: PathBuf,
    ignore: Arc<IgnoreMatcher>,
    interval: Duration,
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    batch_tx: mpsc::Sender<ChangeBatch>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    loop {
        tokio::select! {
            event = raw_rx.recv() => match event {
                Some(Ok(event)) => collect_paths(&root, &ignore, event, &mut pending),
                Some(Err(err)) => warn!(error = %err, "file watch error"),
                None => break,
            },
            _ = ticker.tick() => {
                if pending.is_empty() {
                    continue;
                }
                let batch = ChangeBatch {
                    paths: std::mem::take(&mut pending).into_iter().collect(),
                };
                debug!(count = batch.paths.len(), "change batch ready");
                if batch_tx.send(batch).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("watcher batch loop finished");
}

fn collect_paths(root: &Path, ignore: &IgnoreMatcher, event: Event, out: &mut BTreeSet<PathBuf>) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    for path in event.paths {
        let Some(rel) = relative_to(root, &path) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if rel_str.is_empty() || ignore.is_ignored(&rel_str, path.is_dir()) {
            continue;
        }
        out.insert(rel);
    }
}

/// `path` relative to `root`, retrying with canonical paths when the
/// prefixes differ (symlinked temp dirs on macOS).
fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }
    let canon = path.canonicalize().ok()?;
    canon.strip_prefix(root).ok().map(Path::to_path_buf)
}
