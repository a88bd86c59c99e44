use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::core::RawStatusEntry;
use crate::error::Result;
use crate::git::ops::{open_repo, raw_status, stage_path, unstage_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOp {
    Stage,
    Unstage,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOp::Stage => f.write_str("stage"),
            MutationOp::Unstage => f.write_str("unstage"),
        }
    }
}

/// Blocking primitives over one repository's index and working tree. Callers
/// run these off the async threads; implementations need not be safe for
/// concurrent use against the same root.
pub trait RepositoryBackend: Send + Sync {
    fn stage(&self, root: &Path, relative: &str) -> Result<()>;
    fn unstage(&self, root: &Path, relative: &str) -> Result<()>;
    fn status(&self, root: &Path) -> Result<Vec<RawStatusEntry>>;

    fn mutate(&self, root: &Path, relative: &str, op: MutationOp) -> Result<()> {
        match op {
            MutationOp::Stage => self.stage(root, relative),
            MutationOp::Unstage => self.unstage(root, relative),
        }
    }
}

/// Backend over a git repository. Each call opens the repository afresh and
/// releases it when done.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

impl RepositoryBackend for GitBackend {
    fn stage(&self, root: &Path, relative: &str) -> Result<()> {
        let open = open_repo(root)?;
        stage_path(&open, relative)
    }

    fn unstage(&self, root: &Path, relative: &str) -> Result<()> {
        let open = open_repo(root)?;
        unstage_path(&open, relative)
    }

    fn status(&self, root: &Path) -> Result<Vec<RawStatusEntry>> {
        let open = open_repo(root)?;
        raw_status(&open.repo)
    }
}
