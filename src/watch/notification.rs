use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::git::MutationOp;

/// Failures surfaced to the consumer as discrete events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    RefreshFailed {
        root: PathBuf,
        message: String,
    },
    MutationFailed {
        path: String,
        op: MutationOp,
        message: String,
    },
    WatchSetupFailed {
        root: PathBuf,
        message: String,
    },
    WatchError {
        message: String,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::RefreshFailed { root, message } => {
                write!(f, "status refresh failed for {}: {message}", root.display())
            }
            Notification::MutationFailed { path, op, message } => {
                write!(f, "{op} {path} failed: {message}")
            }
            Notification::WatchSetupFailed { root, message } => {
                write!(f, "could not watch {}: {message}", root.display())
            }
            Notification::WatchError { message } => write!(f, "watch error: {message}"),
        }
    }
}
