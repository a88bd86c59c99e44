#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod util;
pub mod watch;

pub use crate::core::{StatusClass, StatusEntry, StatusSnapshot};
pub use crate::error::{ErrorKind, Result, StatusWatchError};
pub use crate::git::{GitBackend, MutationOp, RepositoryBackend};
pub use crate::watch::{Notification, StatusSync};
