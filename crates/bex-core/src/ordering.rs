//! Orderings for presenting lists of announced records.

use std::cmp::Ordering;

use crate::record::FileRecord;

/// Directories before files, then path ascending.
pub fn alpha_asc_dir_first(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.name.cmp(&b.name))
}

/// Most recently modified first, then path ascending.
pub fn last_mod_desc(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.last_modified_ms()
        .cmp(&a.last_modified_ms())
        .then_with(|| a.name.cmp(&b.name))
}
