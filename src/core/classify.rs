use crate::core::flags::{RawStatusEntry, StatusFlags};
use crate::core::status::{StatusClass, StatusEntry};

pub fn is_index_dirty(flags: StatusFlags) -> bool {
    flags.intersects(StatusFlags::INDEX_MASK)
}

pub fn is_workdir_dirty(flags: StatusFlags) -> bool {
    flags.intersects(StatusFlags::WORKDIR_MASK)
}

/// Maps one backend entry onto the staged/unstaged views. The two families
/// are evaluated independently, so a path can appear in both.
pub fn classify(raw: &RawStatusEntry) -> Vec<StatusEntry> {
    let mut entries = Vec::with_capacity(2);
    if is_index_dirty(raw.flags) {
        entries.push(StatusEntry::new(raw.path.clone(), StatusClass::Staged));
    }
    if is_workdir_dirty(raw.flags) {
        entries.push(StatusEntry::new(raw.path.clone(), StatusClass::Unstaged));
    }
    entries
}

pub fn classify_all<'a, I>(raw: I) -> Vec<StatusEntry>
where
    I: IntoIterator<Item = &'a RawStatusEntry>,
{
    raw.into_iter().flat_map(classify).collect()
}
