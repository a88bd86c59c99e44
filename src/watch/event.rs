use std::path::PathBuf;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};

/// Simplified change kinds fed to the coalescer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
    Rename,
}

impl ChangeKind {
    /// `None` for events that never change file contents or names.
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(ChangeKind::Create),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
            EventKind::Modify(_) => Some(ChangeKind::Modify),
            EventKind::Remove(_) => Some(ChangeKind::Remove),
            EventKind::Any | EventKind::Other => Some(ChangeKind::Modify),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub is_dir: bool,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            is_dir,
        }
    }
}

/// Splits a notify event into one change per path.
pub fn changes_from_event(event: Event) -> Vec<FileChange> {
    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
        return Vec::new();
    };
    let folder_hint = matches!(
        event.kind,
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder)
    );

    event
        .paths
        .into_iter()
        .map(|path| {
            let is_dir = folder_hint || path.is_dir();
            FileChange::new(path, kind, is_dir)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind, RenameMode};
    use notify::{Event, EventKind};

    use super::{changes_from_event, ChangeKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn maps_notify_kinds() {
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Create)
        );
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(ChangeKind::Rename)
        );
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Remove(RemoveKind::Any)),
            Some(ChangeKind::Remove)
        );
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Other),
            Some(ChangeKind::Modify)
        );
        assert_eq!(
            ChangeKind::from_event_kind(&EventKind::Access(AccessKind::Any)),
            None
        );
    }

    #[test]
    fn splits_rename_into_both_paths() {
        let changes = changes_from_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/repo/old.txt", "/repo/new.txt"],
        ));
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|change| change.kind == ChangeKind::Rename));
        assert_eq!(changes[1].path, PathBuf::from("/repo/new.txt"));
    }

    #[test]
    fn folder_events_carry_directory_flag() {
        let changes = changes_from_event(event(
            EventKind::Remove(RemoveKind::Folder),
            &["/repo/gone"],
        ));
        assert!(changes[0].is_dir);
    }

    #[test]
    fn access_events_are_dropped() {
        let changes = changes_from_event(event(
            EventKind::Access(AccessKind::Any),
            &["/repo/a.txt"],
        ));
        assert!(changes.is_empty());
    }
}
