//! Recording index store with scriptable remote echoes.

use std::sync::Mutex;

use tokio::sync::broadcast;

use bex_core::FileRecord;
use bex_push::index::{IndexEvent, IndexStore};
use bex_push::{convert, proto};

/// Index store double.
///
/// Records every pushed announcement and lets tests emit the
/// "records acquired from remote" events the engine completes on.
pub struct MemoryIndexStore {
    events: broadcast::Sender<IndexEvent>,
    pushed: Mutex<Vec<(String, proto::FileInfo)>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            pushed: Mutex::new(Vec::new()),
        }
    }

    /// Emits a remote-echo event carrying `records`.
    pub fn emit_acquired(&self, folder: &str, records: Vec<FileRecord>) {
        let _ = self.events.send(IndexEvent {
            folder: folder.to_string(),
            records,
        });
    }

    /// Acknowledges a sent update as if the remote had stored and
    /// re-announced every record in it.
    pub fn echo_update(&self, update: &proto::IndexUpdate) -> bex_push::Result<()> {
        let records = update
            .files
            .iter()
            .map(|file| convert::record_from_wire(&update.folder, file))
            .collect::<bex_push::Result<Vec<_>>>()?;
        self.emit_acquired(&update.folder, records);
        Ok(())
    }

    /// Records pushed into the store so far, in order.
    pub fn pushed(&self) -> Vec<(String, proto::FileInfo)> {
        self.pushed.lock().expect("push log poisoned").clone()
    }
}

impl Default for MemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore for MemoryIndexStore {
    fn push_record(&self, folder: &str, file: &proto::FileInfo) -> FileRecord {
        self.pushed
            .lock()
            .expect("push log poisoned")
            .push((folder.to_string(), file.clone()));
        convert::record_from_wire(folder, file).expect("announced record is well-formed")
    }

    fn subscribe_events(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }
}
