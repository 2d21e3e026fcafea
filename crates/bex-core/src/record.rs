//! Announced file records.

use crate::block::{hash_blocks, BlockInfo};
use crate::version::Counter;

/// Kind of filesystem entry a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// The unit announced to a remote peer: one file, directory or deletion.
///
/// Deletions keep the type of the record they delete and carry an empty
/// block list, as do directories.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub folder: String,
    /// Path relative to the folder root.
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified_s: i64,
    pub modified_ns: i32,
    pub deleted: bool,
    pub no_permissions: bool,
    pub version: Vec<Counter>,
    pub sequence: u64,
    /// Offset-ascending, contiguous; empty for directories and deletions.
    pub blocks: Vec<BlockInfo>,
}

impl FileRecord {
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Digest of the ordered block-hash list; the equality key matched
    /// against a remote's index echo.
    pub fn content_hash(&self) -> String {
        hash_blocks(&self.blocks)
    }

    /// Millisecond timestamp reassembled from the split modified fields.
    pub fn last_modified_ms(&self) -> i64 {
        self.modified_s * 1000 + i64::from(self.modified_ns) / 1_000_000
    }
}
