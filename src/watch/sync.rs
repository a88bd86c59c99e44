use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::error;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

use crate::config::WatchConfig;
use crate::core::StatusSnapshot;
use crate::error::{Result, StatusWatchError};
use crate::git::{GitBackend, MutationOp, RepositoryBackend};
use crate::watch::notification::Notification;
use crate::watch::pipeline::RefreshPipeline;
use crate::watch::session::{NativeWatchProvider, SessionState, WatchProvider, WatchSession};

/// Consumer-facing handle: one watched root at a time, its live snapshot, and
/// stage/unstage requests against it.
pub struct StatusSync {
    config: WatchConfig,
    provider: Arc<dyn WatchProvider>,
    pipeline: RefreshPipeline,
    runtime: Handle,
    session: Mutex<Option<WatchSession>>,
}

impl StatusSync {
    /// Must be called from within a tokio runtime.
    pub fn new(backend: Arc<dyn RepositoryBackend>, config: WatchConfig) -> Result<Self> {
        Self::with_provider(backend, Arc::new(NativeWatchProvider), config)
    }

    /// Like [`new`](Self::new) with a custom source of OS-level watches.
    pub fn with_provider(
        backend: Arc<dyn RepositoryBackend>,
        provider: Arc<dyn WatchProvider>,
        config: WatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let runtime =
            Handle::try_current().map_err(|err| StatusWatchError::Other(anyhow::Error::new(err)))?;
        Ok(Self {
            config,
            provider,
            pipeline: RefreshPipeline::new(backend, runtime.clone()),
            runtime,
            session: Mutex::new(None),
        })
    }

    pub fn with_git(config: WatchConfig) -> Result<Self> {
        Self::new(Arc::new(GitBackend), config)
    }

    /// Replaces the watched root. The previous session is torn down before
    /// this returns. A blank or non-directory path leaves nothing watched and
    /// is not an error.
    pub fn set_root(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut session = self.lock_session();
        if let Some(mut previous) = session.take() {
            previous.stop();
        }

        let Some(root) = WatchSession::resolve_root(path.as_ref()) else {
            self.pipeline.deactivate();
            return Ok(());
        };

        let token = self.pipeline.activate(root.clone());
        match WatchSession::start(
            root.clone(),
            &self.config,
            self.provider.as_ref(),
            &self.pipeline,
            token,
            &self.runtime,
        ) {
            Ok(started) => {
                *session = Some(started);
                Ok(())
            }
            Err(err) => {
                self.pipeline.deactivate();
                error!("failed to watch {}: {err}", root.display());
                self.pipeline.notify(Notification::WatchSetupFailed {
                    root,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn clear_root(&self) {
        let mut session = self.lock_session();
        if let Some(mut previous) = session.take() {
            previous.stop();
        }
        self.pipeline.deactivate();
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.pipeline.root()
    }

    pub fn session_state(&self) -> SessionState {
        self.lock_session()
            .as_ref()
            .map(WatchSession::state)
            .unwrap_or(SessionState::Stopped)
    }

    pub async fn stage(&self, relative: &str) -> Result<bool> {
        self.pipeline.mutate(relative, MutationOp::Stage).await
    }

    pub async fn unstage(&self, relative: &str) -> Result<bool> {
        self.pipeline.mutate(relative, MutationOp::Unstage).await
    }

    pub fn request_refresh(&self) {
        self.pipeline.request_refresh();
    }

    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.pipeline.current_snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.pipeline.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.pipeline.notifications()
    }

    pub async fn wait_idle(&self) {
        self.pipeline.wait_idle().await;
    }

    pub fn pipeline(&self) -> &RefreshPipeline {
        &self.pipeline
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<WatchSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StatusSync {
    fn drop(&mut self) {
        self.clear_root();
    }
}
