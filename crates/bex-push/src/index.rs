//! The local index store and its remote-echo events.

use tokio::sync::broadcast;

use bex_core::FileRecord;

use crate::proto;

/// Event emitted when records announced by the remote peer land in the
/// local index: the echo that confirms the remote holds a file.
#[derive(Debug, Clone)]
pub struct IndexEvent {
    pub folder: String,
    pub records: Vec<FileRecord>,
}

/// The folder-scoped index this engine records announcements into.
pub trait IndexStore: Send + Sync + 'static {
    /// Persists a record we announced, so future local views agree with
    /// what the remote has been told. Returns the record as stored.
    fn push_record(&self, folder: &str, file: &proto::FileInfo) -> FileRecord;

    /// Subscribes to records acquired from the remote peer.
    fn subscribe_events(&self) -> broadcast::Receiver<IndexEvent>;
}
