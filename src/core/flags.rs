use bitflags::bitflags;

bitflags! {
    /// Backend status bits for a single path, split into an index-relative
    /// family (HEAD vs index) and a workdir-relative family (index vs working
    /// tree).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u16 {
        const INDEX_NEW        = 1 << 0;
        const INDEX_MODIFIED   = 1 << 1;
        const INDEX_DELETED    = 1 << 2;
        const INDEX_RENAMED    = 1 << 3;
        const INDEX_TYPECHANGE = 1 << 4;

        const WT_NEW        = 1 << 7;
        const WT_MODIFIED   = 1 << 8;
        const WT_DELETED    = 1 << 9;
        const WT_RENAMED    = 1 << 10;
        const WT_TYPECHANGE = 1 << 11;

        const CONFLICTED = 1 << 15;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl StatusFlags {
    pub const INDEX_MASK: StatusFlags = StatusFlags::INDEX_NEW
        .union(StatusFlags::INDEX_MODIFIED)
        .union(StatusFlags::INDEX_DELETED)
        .union(StatusFlags::INDEX_RENAMED)
        .union(StatusFlags::INDEX_TYPECHANGE);

    // Conflicts need resolving in the working tree, so they count as workdir changes.
    pub const WORKDIR_MASK: StatusFlags = StatusFlags::WT_NEW
        .union(StatusFlags::WT_MODIFIED)
        .union(StatusFlags::WT_DELETED)
        .union(StatusFlags::WT_RENAMED)
        .union(StatusFlags::WT_TYPECHANGE)
        .union(StatusFlags::CONFLICTED);
}

/// One path as reported by the backend, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatusEntry {
    pub path: String,
    pub flags: StatusFlags,
}

impl RawStatusEntry {
    pub fn new(path: impl Into<String>, flags: StatusFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StatusFlags;

    #[test]
    fn masks_do_not_overlap() {
        assert!(!StatusFlags::INDEX_MASK.intersects(StatusFlags::WORKDIR_MASK));
        assert!(StatusFlags::WORKDIR_MASK.contains(StatusFlags::CONFLICTED));
    }

    #[test]
    fn masks_cover_every_named_flag() {
        assert_eq!(
            StatusFlags::INDEX_MASK | StatusFlags::WORKDIR_MASK,
            StatusFlags::all()
        );
        assert_eq!(StatusFlags::default(), StatusFlags::empty());
    }

    #[test]
    fn merging_flags_keeps_both_families() {
        let mut flags = StatusFlags::default();
        flags |= StatusFlags::INDEX_NEW;
        flags |= StatusFlags::WT_MODIFIED;
        assert!(flags.intersects(StatusFlags::INDEX_MASK));
        assert!(flags.intersects(StatusFlags::WORKDIR_MASK));
        assert!(!flags.contains(StatusFlags::INDEX_MASK));
    }
}
