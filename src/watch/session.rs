use std::path::{Path, PathBuf};

use log::{debug, error, info, trace};
use notify::{Event, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::config::WatchConfig;
use crate::error::{Result, StatusWatchError};
use crate::util::paths::is_blank;
use crate::watch::coalescer::{run_coalescer, ChangeCoalescer, ChangeFilter};
use crate::watch::event::{changes_from_event, FileChange};
use crate::watch::notification::Notification;
use crate::watch::pipeline::{RefreshPipeline, RootToken};

/// Receives raw OS events for a watched root.
pub type EventCallback = Box<dyn FnMut(notify::Result<Event>) + Send + 'static>;

/// Registers the OS-level recursive watch for a session. The returned watcher
/// keeps the registration alive until it is dropped.
pub trait WatchProvider: Send + Sync {
    fn watch(
        &self,
        root: &Path,
        on_event: EventCallback,
    ) -> notify::Result<Box<dyn Watcher + Send>>;
}

/// The platform's native watcher (inotify, FSEvents, ReadDirectoryChangesW).
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeWatchProvider;

impl WatchProvider for NativeWatchProvider {
    fn watch(
        &self,
        root: &Path,
        on_event: EventCallback,
    ) -> notify::Result<Box<dyn Watcher + Send>> {
        let mut watcher = notify::recommended_watcher(on_event)?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Box::new(watcher))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Active,
}

/// Owns the OS-level watch on one root and the coalescer task it feeds.
pub struct WatchSession {
    root: PathBuf,
    state: SessionState,
    watcher: Option<Box<dyn Watcher + Send>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl WatchSession {
    /// Returns the directory a session would watch for `input`, or `None`
    /// when the input is blank or not an existing directory.
    pub fn resolve_root(input: &Path) -> Option<PathBuf> {
        if is_blank(input) {
            return None;
        }
        let root = input.to_path_buf();
        if !root.is_dir() {
            debug!("{} is not a directory, nothing to watch", root.display());
            return None;
        }
        Some(std::fs::canonicalize(&root).unwrap_or(root))
    }

    /// Registers a recursive watch on `root` through `provider`, starts the
    /// coalescer and requests the initial refresh. `root` must already be
    /// resolved.
    pub fn start(
        root: PathBuf,
        config: &WatchConfig,
        provider: &dyn WatchProvider,
        pipeline: &RefreshPipeline,
        token: RootToken,
        runtime: &Handle,
    ) -> Result<Self> {
        let mut session = Self {
            root,
            state: SessionState::Starting,
            watcher: None,
            shutdown: None,
        };
        debug!("session {} -> {:?}", session.root.display(), session.state);

        let filter = ChangeFilter::new(session.root.clone(), config.ignore_set()?);
        let (change_tx, change_rx) = mpsc::channel::<FileChange>(config.event_buffer);
        let errors = pipeline.clone();
        let on_event: EventCallback = Box::new(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in changes_from_event(event) {
                    // A full channel already has a refresh on the way.
                    if change_tx.try_send(change).is_err() {
                        trace!("change channel full or closed, dropping event");
                    }
                }
            }
            Err(err) => {
                error!("filesystem watch error: {err}");
                errors.notify(Notification::WatchError {
                    message: err.to_string(),
                });
            }
        });
        let watcher = match provider.watch(&session.root, on_event) {
            Ok(watcher) => watcher,
            Err(source) => {
                session.state = SessionState::Stopped;
                return Err(StatusWatchError::WatchSetup {
                    path: session.root.clone(),
                    source,
                });
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let trigger = pipeline.clone();
        runtime.spawn(run_coalescer(
            ChangeCoalescer::new(config.quiet_period()),
            filter,
            change_rx,
            shutdown_rx,
            move || trigger.request_refresh_for(token),
        ));

        session.watcher = Some(watcher);
        session.shutdown = Some(shutdown_tx);
        session.state = SessionState::Active;
        info!("watching {}", session.root.display());

        pipeline.request_refresh_for(token);
        Ok(session)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Cancels the OS watch, then the pending quiet-period timer.
    pub fn stop(&mut self) {
        let was_active = self.state == SessionState::Active;
        drop(self.watcher.take());
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.state = SessionState::Stopped;
        if was_active {
            info!("stopped watching {}", self.root.display());
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}
