use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use gix::bstr::ByteSlice;
use gix::diff::index::ChangeRef;
use gix::progress::Discard;
use gix::status::index_worktree::iter::Summary;
use gix::status::UntrackedFiles;
use log::{debug, trace};

use crate::core::{RawStatusEntry, StatusFlags};
use crate::error::{Result, StatusWatchError};

pub struct OpenRepo {
    pub path: PathBuf,
    pub repo: gix::Repository,
}

impl OpenRepo {
    pub fn workdir(&self) -> Result<&Path> {
        self.repo.workdir().ok_or_else(|| {
            StatusWatchError::Backend(anyhow::anyhow!(
                "operation requires a worktree but repository at {} is bare",
                self.path.display()
            ))
        })
    }
}

pub fn open_repo(path: &Path) -> Result<OpenRepo> {
    let repo = gix::open(path).map_err(StatusWatchError::backend)?;
    Ok(OpenRepo {
        path: path.to_path_buf(),
        repo,
    })
}

/// Reads HEAD↔index and index↔worktree changes and merges them into one
/// flag set per path.
pub fn raw_status(repo: &gix::Repository) -> Result<Vec<RawStatusEntry>> {
    let platform = repo
        .status(Discard)
        .map_err(StatusWatchError::backend)?
        .untracked_files(UntrackedFiles::Files);
    let mut by_path: BTreeMap<String, StatusFlags> = BTreeMap::new();

    for item in platform
        .into_iter(Vec::new())
        .map_err(StatusWatchError::backend)?
    {
        let item = item.map_err(StatusWatchError::backend)?;
        match item {
            gix::status::Item::TreeIndex(change) => {
                let path = change.location().to_str_lossy().to_string();
                let flag = tree_index_flag(&change);
                trace!("index change {path}: {flag:?}");
                *by_path.entry(path).or_default() |= flag;
            }
            gix::status::Item::IndexWorktree(index_item) => {
                let Some(flag) = index_item.summary().map(worktree_flag) else {
                    continue;
                };
                let path = index_item.rela_path().to_str_lossy().to_string();
                trace!("worktree change {path}: {flag:?}");
                *by_path.entry(path).or_default() |= flag;
            }
        }
    }

    Ok(by_path
        .into_iter()
        .map(|(path, flags)| RawStatusEntry::new(path, flags))
        .collect())
}

fn tree_index_flag(change: &ChangeRef<'_, '_>) -> StatusFlags {
    match change {
        ChangeRef::Addition { .. } => StatusFlags::INDEX_NEW,
        ChangeRef::Deletion { .. } => StatusFlags::INDEX_DELETED,
        ChangeRef::Modification { .. } => StatusFlags::INDEX_MODIFIED,
        ChangeRef::Rewrite { .. } => StatusFlags::INDEX_RENAMED,
    }
}

fn worktree_flag(summary: Summary) -> StatusFlags {
    match summary {
        Summary::Added | Summary::IntentToAdd => StatusFlags::WT_NEW,
        Summary::Removed => StatusFlags::WT_DELETED,
        Summary::Modified => StatusFlags::WT_MODIFIED,
        Summary::TypeChange => StatusFlags::WT_TYPECHANGE,
        Summary::Renamed | Summary::Copied => StatusFlags::WT_RENAMED,
        Summary::Conflict => StatusFlags::CONFLICTED,
    }
}

pub fn head_is_unborn(repo: &gix::Repository) -> Result<bool> {
    let head = repo.head().map_err(StatusWatchError::backend)?;
    Ok(head.is_unborn())
}

pub fn stage_path(open: &OpenRepo, relative: &str) -> Result<()> {
    run_git_command(open.workdir()?, &["add", "--", relative], "add")
}

pub fn unstage_path(open: &OpenRepo, relative: &str) -> Result<()> {
    let workdir = open.workdir()?;
    if head_is_unborn(&open.repo)? {
        return run_git_command(
            workdir,
            &["rm", "-r", "--cached", "--quiet", "--", relative],
            "rm --cached",
        );
    }
    run_git_command(workdir, &["reset", "--quiet", "--", relative], "reset")
}

fn run_git_command(workdir: &Path, args: &[&str], context: &str) -> Result<()> {
    debug!("git {} (in {})", args.join(" "), workdir.display());
    // Callers pass file paths, not pathspecs: no globbing or `:(magic)`.
    let output = Command::new("git")
        .args(args)
        .current_dir(workdir)
        .env("GIT_LITERAL_PATHSPECS", "1")
        .output()
        .map_err(StatusWatchError::backend)?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(StatusWatchError::Backend(anyhow::anyhow!(
        "git {} failed: {}",
        context,
        if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        }
    )))
}
