use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum StatusWatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),
    #[error("failed to watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of [`StatusWatchError`] for consumers that only need
/// to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    BackendFailure,
    WatchSetupFailure,
    Config,
    Io,
    Other,
}

impl StatusWatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StatusWatchError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StatusWatchError::Backend(_) => ErrorKind::BackendFailure,
            StatusWatchError::WatchSetup { .. } => ErrorKind::WatchSetupFailure,
            StatusWatchError::Config(_) => ErrorKind::Config,
            StatusWatchError::Io(_) => ErrorKind::Io,
            StatusWatchError::Other(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StatusWatchError::Backend(anyhow::Error::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StatusWatchError>;
