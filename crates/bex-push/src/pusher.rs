//! The outbound push engine.
//!
//! Announces a local change (file, directory or deletion) to the remote
//! peer and serves the resulting block requests until the remote has
//! reconstructed the file. One engine instance wraps one peer channel;
//! each push returns an observer that owns the upload's resources.

use std::io::Read;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use bex_core::{
    extend_version, Counter, DataSource, DeviceConfig, FileRecord, Sequencer, SystemTempFiles,
    TempFileProvider,
};

use crate::channel::{MessageChannel, OutboundMessage, WriteHandle};
use crate::index::{IndexEvent, IndexStore};
use crate::observer::{FileUploadObserver, IndexEditObserver, UploadState};
use crate::request::{self, RequestServer};
use crate::{convert, proto, Error, Result};

/// The outbound block-exchange engine for one peer channel.
pub struct Pusher {
    config: DeviceConfig,
    channel: Arc<dyn MessageChannel>,
    sequencer: Arc<dyn Sequencer>,
    index: Option<Arc<dyn IndexStore>>,
    temp_files: Arc<dyn TempFileProvider>,
    close_channel: bool,
}

impl Pusher {
    pub fn new(
        config: DeviceConfig,
        channel: Arc<dyn MessageChannel>,
        sequencer: Arc<dyn Sequencer>,
    ) -> Self {
        let temp_files: Arc<dyn TempFileProvider> = match &config.temp_dir {
            Some(dir) => Arc::new(SystemTempFiles::in_dir(dir)),
            None => Arc::new(SystemTempFiles::new()),
        };
        Self {
            config,
            channel,
            sequencer,
            index: None,
            temp_files,
            close_channel: false,
        }
    }

    /// Attaches the local index store, enabling echo-based completion and
    /// local persistence when observers close.
    pub fn with_index(mut self, index: Arc<dyn IndexStore>) -> Self {
        self.index = Some(index);
        self
    }

    /// Replaces the provider backing spilled upload streams.
    pub fn with_temp_files(mut self, provider: Arc<dyn TempFileProvider>) -> Self {
        self.temp_files = provider;
        self
    }

    /// Makes observers close the channel when they are released.
    pub fn close_channel_on_release(mut self) -> Self {
        self.close_channel = true;
        self
    }

    /// Announces a newly created directory.
    pub fn push_dir(&self, folder: &str, path: &str) -> Result<IndexEditObserver> {
        self.check_folder(folder)?;
        let (handle, update) = self.send_index_update(
            folder,
            RecordDraft {
                name: path,
                file_type: proto::FileInfoType::Directory,
                size: 0,
                deleted: false,
                blocks: Vec::new(),
            },
            None,
        );
        Ok(IndexEditObserver::new(
            handle,
            update,
            Arc::clone(&self.channel),
            self.index.clone(),
            self.close_channel,
        ))
    }

    /// Announces the deletion of `path`, carrying the prior record's
    /// version history and type.
    pub fn push_delete(
        &self,
        prev: &FileRecord,
        folder: &str,
        path: &str,
    ) -> Result<IndexEditObserver> {
        self.check_folder(folder)?;
        check_record_scope(prev, folder, path)?;
        let (handle, update) = self.send_index_update(
            folder,
            RecordDraft {
                name: path,
                file_type: convert::file_type_to_wire(prev.file_type),
                size: 0,
                deleted: true,
                blocks: Vec::new(),
            },
            Some(&prev.version),
        );
        Ok(IndexEditObserver::new(
            handle,
            update,
            Arc::clone(&self.channel),
            self.index.clone(),
            self.close_channel,
        ))
    }

    /// Announces a file whose bytes come from a non-restartable stream.
    ///
    /// The stream is spilled to a temp file first so block requests can be
    /// served by random access; the spill file is removed when the
    /// upload's data source is dropped.
    pub fn push_stream(
        &self,
        reader: &mut dyn Read,
        prev: Option<&FileRecord>,
        folder: &str,
        path: &str,
    ) -> Result<FileUploadObserver> {
        let source = DataSource::spill(reader, self.temp_files.as_ref())?;
        self.push_file(source, prev, folder, path)
    }

    /// Announces a file and serves block requests until the remote has
    /// reconstructed it.
    ///
    /// The returned observer reports progress as responses hit the wire
    /// and completes when the attached index store sees the remote
    /// re-announce a record with the same path and content hash.
    pub fn push_file(
        &self,
        source: DataSource,
        prev: Option<&FileRecord>,
        folder: &str,
        path: &str,
    ) -> Result<FileUploadObserver> {
        self.check_folder(folder)?;
        if let Some(prev) = prev {
            check_record_scope(prev, folder, path)?;
        }
        let source = Arc::new(source);
        let size = source.size()?;
        let blocks = source.blocks()?.to_vec();
        let total_blocks = source.hashes()?.len();
        let content_hash = source.content_hash()?.to_string();

        let (state_tx, state_rx) = watch::channel(UploadState::default());
        let state = Arc::new(state_tx);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = request::spawn(
            RequestServer {
                channel: Arc::clone(&self.channel),
                source: Arc::clone(&source),
                folder: folder.to_string(),
                name: path.to_string(),
                state: Arc::clone(&state),
            },
            self.channel.subscribe_requests(),
            shutdown_rx.clone(),
        );
        let echo_listener = self.index.as_ref().map(|index| {
            spawn_echo_listener(
                index.subscribe_events(),
                folder.to_string(),
                path.to_string(),
                content_hash,
                Arc::clone(&state),
                shutdown_rx,
            )
        });

        debug!(%path, size, blocks = blocks.len(), "announcing file");
        let (_write, update) = self.send_index_update(
            folder,
            RecordDraft {
                name: path,
                file_type: proto::FileInfoType::File,
                size: size as i64,
                deleted: false,
                blocks: blocks.iter().map(convert::block_to_wire).collect(),
            },
            prev.map(|p| p.version.as_slice()),
        );

        Ok(FileUploadObserver {
            state: state_rx,
            shutdown: shutdown_tx,
            dispatcher,
            echo_listener,
            source,
            update,
            channel: Arc::clone(&self.channel),
            index: self.index.clone(),
            close_channel: self.close_channel,
            total_blocks,
        })
    }

    fn check_folder(&self, folder: &str) -> Result<()> {
        if self.channel.has_folder(folder) {
            Ok(())
        } else {
            Err(Error::FolderNotShared(folder.to_string()))
        }
    }

    /// Allocates a sequence, extends the version vector and enqueues one
    /// single-record index update.
    ///
    /// The sequence is allocated exactly once and shared by the record's
    /// `sequence` field and the appended counter. A failed wire write does
    /// not return the sequence; the next record simply skips it.
    fn send_index_update(
        &self,
        folder: &str,
        draft: RecordDraft<'_>,
        prev_version: Option<&[Counter]>,
    ) -> (WriteHandle, proto::IndexUpdate) {
        let sequence = self.sequencer.next_sequence();
        let device = self.config.device_id.short_id();
        let counters = extend_version(prev_version.unwrap_or(&[]), device, sequence);
        let now_ms = now_unix_ms();
        let file = proto::FileInfo {
            name: draft.name.to_string(),
            r#type: draft.file_type as i32,
            size: draft.size,
            modified_s: now_ms / 1000,
            deleted: draft.deleted,
            no_permissions: true,
            version: Some(proto::Vector {
                counters: counters.iter().copied().map(convert::counter_to_wire).collect(),
            }),
            sequence: sequence as i64,
            modified_ns: ((now_ms % 1000) * 1_000_000) as i32,
            blocks: draft.blocks,
        };
        debug!(folder, name = %file.name, sequence, "sending index update");
        let update = proto::IndexUpdate {
            folder: folder.to_string(),
            files: vec![file],
        };
        let handle = self
            .channel
            .send(OutboundMessage::IndexUpdate(update.clone()));
        (handle, update)
    }
}

struct RecordDraft<'a> {
    name: &'a str,
    file_type: proto::FileInfoType,
    size: i64,
    deleted: bool,
    blocks: Vec<proto::BlockInfo>,
}

fn check_record_scope(prev: &FileRecord, folder: &str, path: &str) -> Result<()> {
    if prev.folder == folder && prev.name == path {
        Ok(())
    } else {
        Err(Error::RecordMismatch {
            folder: folder.to_string(),
            name: path.to_string(),
            actual_folder: prev.folder.clone(),
            actual_name: prev.name.clone(),
        })
    }
}

/// Watches the local index for the remote's echo of the announced file
/// and flips the upload to completed when it arrives.
fn spawn_echo_listener(
    mut events: broadcast::Receiver<IndexEvent>,
    folder: String,
    name: String,
    content_hash: String,
    state: Arc<watch::Sender<UploadState>>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return;
                    }
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        if event.folder != folder {
                            continue;
                        }
                        let confirmed = event
                            .records
                            .iter()
                            .any(|r| r.name == name && r.content_hash() == content_hash);
                        if confirmed {
                            debug!(%name, "remote confirmed full file");
                            state.send_modify(|s| s.completed = true);
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    })
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
