use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Classification of a path in a snapshot. Only `Staged` and `Unstaged` are
/// produced today; the remaining states are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Unstaged,
    Staged,
    Untracked,
    Modified,
    Deleted,
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusClass::Unstaged => "unstaged",
            StatusClass::Staged => "staged",
            StatusClass::Untracked => "untracked",
            StatusClass::Modified => "modified",
            StatusClass::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StatusEntry {
    path: String,
    state: StatusClass,
}

impl StatusEntry {
    pub fn new(path: impl Into<String>, state: StatusClass) -> Self {
        Self {
            path: path.into(),
            state,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> StatusClass {
        self.state
    }
}

/// Staged and unstaged views of the repository captured by a single recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub root: Option<PathBuf>,
    pub generation: u64,
    pub unstaged: BTreeSet<StatusEntry>,
    pub staged: BTreeSet<StatusEntry>,
}

impl StatusSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot by routing every entry into the set matching its
    /// state. Reserved states land in the unstaged view.
    pub fn from_entries<I>(root: Option<PathBuf>, generation: u64, entries: I) -> Self
    where
        I: IntoIterator<Item = StatusEntry>,
    {
        let mut snapshot = Self {
            root,
            generation,
            ..Self::default()
        };
        for entry in entries {
            match entry.state() {
                StatusClass::Staged => snapshot.staged.insert(entry),
                _ => snapshot.unstaged.insert(entry),
            };
        }
        snapshot
    }

    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }

    pub fn is_staged(&self, path: &str) -> bool {
        self.staged.iter().any(|entry| entry.path() == path)
    }

    pub fn is_unstaged(&self, path: &str) -> bool {
        self.unstaged.iter().any(|entry| entry.path() == path)
    }

    /// Value equality on the classified sets, ignoring root and generation.
    pub fn same_entries(&self, other: &StatusSnapshot) -> bool {
        self.staged == other.staged && self.unstaged == other.unstaged
    }
}
