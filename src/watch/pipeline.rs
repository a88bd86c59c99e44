//! Serialized "status → classify → publish" cycles.
//!
//! At most one recompute runs per root. Requests that arrive while one is in
//! flight collapse into a single rerun flag. Replacing the root bumps an
//! epoch; work tagged with an older epoch never publishes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, trace, warn};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

use crate::core::{classify_all, StatusEntry, StatusSnapshot};
use crate::error::{Result, StatusWatchError};
use crate::git::{MutationOp, RepositoryBackend};
use crate::util::paths::normalize_relative;
use crate::watch::notification::Notification;

pub const NOTIFICATION_CAPACITY: usize = 64;

/// Identifies one activation of a watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootToken(u64);

#[derive(Clone)]
pub struct RefreshPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn RepositoryBackend>,
    runtime: Handle,
    state: Mutex<PipelineState>,
    snapshots: watch::Sender<Arc<StatusSnapshot>>,
    busy: watch::Sender<bool>,
    notifications: broadcast::Sender<Notification>,
}

#[derive(Default)]
struct PipelineState {
    active: Option<ActiveRoot>,
    epoch: u64,
    running: bool,
    rerun: bool,
    generation: u64,
    // Keyed by root so re-activating a path reuses the gate still held by
    // in-flight work from the earlier activation.
    gates: HashMap<PathBuf, Gate>,
}

type Gate = Arc<tokio::sync::Mutex<()>>;

#[derive(Clone)]
struct ActiveRoot {
    path: PathBuf,
    token: RootToken,
    // Serializes backend calls against this root.
    gate: Gate,
}

impl RefreshPipeline {
    pub fn new(backend: Arc<dyn RepositoryBackend>, runtime: Handle) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(StatusSnapshot::empty()));
        let (busy, _) = watch::channel(false);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                backend,
                runtime,
                state: Mutex::new(PipelineState::default()),
                snapshots,
                busy,
                notifications,
            }),
        }
    }

    /// Switches the pipeline to `root` and publishes an empty snapshot for
    /// it. In-flight work for the previous root becomes stale.
    pub fn activate(&self, root: PathBuf) -> RootToken {
        let state = self.replace_root(Some(root));
        RootToken(state.epoch)
    }

    pub fn deactivate(&self) {
        drop(self.replace_root(None));
    }

    fn replace_root(&self, root: Option<PathBuf>) -> MutexGuard<'_, PipelineState> {
        let mut state = self.inner.lock();
        state.epoch += 1;
        state.running = false;
        state.rerun = false;
        state.generation += 1;
        let token = RootToken(state.epoch);
        state.active = None;
        // Drop gates nothing else holds any more.
        state.gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        let active = root.clone().map(|path| {
            let gate = Arc::clone(state.gates.entry(path.clone()).or_default());
            ActiveRoot { path, token, gate }
        });
        state.active = active;

        self.inner.snapshots.send_replace(Arc::new(StatusSnapshot {
            root,
            generation: state.generation,
            ..StatusSnapshot::default()
        }));
        self.inner.busy.send_replace(false);
        state
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.inner.active_root().map(|active| active.path)
    }

    /// Fire-and-forget. Starts a recompute, or marks one to run again after
    /// the current one finishes.
    pub fn request_refresh(&self) {
        self.inner.request(None);
    }

    /// Like [`request_refresh`](Self::request_refresh) but ignored once
    /// `token`'s root has been replaced.
    pub fn request_refresh_for(&self, token: RootToken) {
        self.inner.request(Some(token));
    }

    /// Stages or unstages `relative` under the current root. Returns
    /// `Ok(false)` without touching the backend when no root is set. A
    /// successful mutation schedules a refresh; a failed one does not.
    pub async fn mutate(&self, relative: &str, op: MutationOp) -> Result<bool> {
        let relative = normalize_relative(relative)?;
        let Some(active) = self.inner.active_root() else {
            debug!("{op} {relative} skipped, nothing is watched");
            return Ok(false);
        };

        let gate = active.gate.lock().await;
        let backend = self.inner.backend.clone();
        let root = active.path.clone();
        let path = relative.clone();
        let result = tokio::task::spawn_blocking(move || backend.mutate(&root, &path, op))
            .await
            .map_err(StatusWatchError::backend)
            .and_then(|result| result);
        drop(gate);

        match result {
            Ok(()) => {
                info!("{op} {relative}");
                self.request_refresh_for(active.token);
                Ok(true)
            }
            Err(err) => {
                warn!("{op} {relative} failed: {err}");
                self.notify(Notification::MutationFailed {
                    path: relative,
                    op,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn current_snapshot(&self) -> Arc<StatusSnapshot> {
        self.inner.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    pub fn notify(&self, notification: Notification) {
        let _ = self.inner.notifications.send(notification);
    }

    pub fn is_busy(&self) -> bool {
        *self.inner.busy.borrow()
    }

    /// Resolves once no recompute is running or queued for the current root.
    pub async fn wait_idle(&self) {
        let mut busy = self.inner.busy.subscribe();
        let _ = busy.wait_for(|busy| !*busy).await;
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_root(&self) -> Option<ActiveRoot> {
        self.lock().active.clone()
    }

    fn is_current(&self, token: RootToken) -> bool {
        self.lock().epoch == token.0
    }

    fn request(self: &Arc<Self>, expected: Option<RootToken>) {
        let mut state = self.lock();
        let Some(active) = state.active.clone() else {
            trace!("refresh requested with no watched root");
            return;
        };
        if expected.is_some_and(|token| token != active.token) {
            debug!("ignoring refresh for a replaced root");
            return;
        }
        if state.running {
            trace!("recompute in flight, marking rerun");
            state.rerun = true;
            return;
        }
        state.running = true;
        self.busy.send_replace(true);
        drop(state);

        let inner = Arc::clone(self);
        self.runtime.spawn(async move { inner.drive(active).await });
    }

    async fn drive(self: Arc<Self>, active: ActiveRoot) {
        loop {
            self.recompute(&active).await;
            if !self.finish_cycle(active.token) {
                return;
            }
            debug!("rerunning status for {}", active.path.display());
        }
    }

    /// Returns `true` when another cycle is due for the same root.
    fn finish_cycle(&self, token: RootToken) -> bool {
        let mut state = self.lock();
        if state.epoch != token.0 {
            return false;
        }
        if state.rerun {
            state.rerun = false;
            return true;
        }
        state.running = false;
        self.busy.send_replace(false);
        false
    }

    async fn recompute(&self, active: &ActiveRoot) {
        let _gate = active.gate.lock().await;
        let backend = self.backend.clone();
        let root = active.path.clone();
        let result = tokio::task::spawn_blocking(move || backend.status(&root)).await;

        match result {
            Ok(Ok(raw)) => {
                let entries = classify_all(&raw);
                self.publish(active, entries);
            }
            Ok(Err(err)) => self.refresh_failed(active, err.to_string()),
            Err(err) => self.refresh_failed(active, err.to_string()),
        }
    }

    fn publish(&self, active: &ActiveRoot, entries: Vec<StatusEntry>) {
        let mut state = self.lock();
        if state.epoch != active.token.0 {
            debug!("discarding stale snapshot for {}", active.path.display());
            return;
        }
        state.generation += 1;
        let snapshot =
            StatusSnapshot::from_entries(Some(active.path.clone()), state.generation, entries);
        debug!(
            "snapshot {} for {}: {} staged, {} unstaged",
            snapshot.generation,
            active.path.display(),
            snapshot.staged.len(),
            snapshot.unstaged.len()
        );
        self.snapshots.send_replace(Arc::new(snapshot));
    }

    fn refresh_failed(&self, active: &ActiveRoot, message: String) {
        if !self.is_current(active.token) {
            debug!("discarding stale refresh failure for {}", active.path.display());
            return;
        }
        warn!("status refresh failed for {}: {message}", active.path.display());
        let _ = self.notifications.send(Notification::RefreshFailed {
            root: active.path.clone(),
            message,
        });
    }
}
