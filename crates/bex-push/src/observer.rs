//! Upload observation: progress, completion and scoped release.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use bex_core::DataSource;

use crate::channel::{MessageChannel, WriteHandle};
use crate::index::IndexStore;
use crate::{proto, Error, Result};

/// Shared state of one in-flight upload.
///
/// Mutated only through `watch::Sender::send_modify`, so every change is
/// published to waiters under the channel's own lock.
#[derive(Debug, Default)]
pub(crate) struct UploadState {
    /// Hex hashes of blocks whose response reached the wire.
    pub sent_blocks: HashSet<String>,
    /// First read or write failure; later failures are dropped.
    pub error: Option<Arc<Error>>,
    /// Flipped by the remote-echo listener, never cleared.
    pub completed: bool,
}

/// Records a failure into the shared state; the first failure wins.
pub(crate) fn record_failure(state: &watch::Sender<UploadState>, error: Error) {
    state.send_modify(|s| {
        if s.error.is_none() {
            s.error = Some(Arc::new(error));
        }
    });
}

/// Observer for one file upload.
///
/// Owns every resource scoped to the upload: the request dispatcher, the
/// optional index-echo listener, the shared upload state, the data source
/// and the announced record. Dropping the observer winds the background
/// tasks down without persisting anything; [`close`](Self::close) is the
/// graceful release.
pub struct FileUploadObserver {
    pub(crate) state: watch::Receiver<UploadState>,
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) dispatcher: JoinHandle<()>,
    pub(crate) echo_listener: Option<JoinHandle<()>>,
    pub(crate) source: Arc<DataSource>,
    pub(crate) update: proto::IndexUpdate,
    pub(crate) channel: Arc<dyn MessageChannel>,
    pub(crate) index: Option<Arc<dyn IndexStore>>,
    pub(crate) close_channel: bool,
    /// Number of distinct block hashes in the announced file.
    pub(crate) total_blocks: usize,
}

impl std::fmt::Debug for FileUploadObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUploadObserver")
            .field("update", &self.update)
            .field("total_blocks", &self.total_blocks)
            .field("close_channel", &self.close_channel)
            .finish_non_exhaustive()
    }
}

impl FileUploadObserver {
    /// Fraction of distinct blocks served, or 1.0 once the remote echo has
    /// confirmed the file. A file with no blocks reports 1.0 from the
    /// start while [`completed`](Self::completed) stays false until the
    /// echo arrives.
    pub fn progress(&self) -> f64 {
        let state = self.state.borrow();
        if state.completed || self.total_blocks == 0 {
            return 1.0;
        }
        state.sent_blocks.len() as f64 / self.total_blocks as f64
    }

    /// Human-readable progress, e.g. `66.7% 2/3`.
    pub fn progress_message(&self) -> String {
        let pct = (self.progress() * 1000.0).round() / 10.0;
        let sent = self.state.borrow().sent_blocks.len();
        format!("{:.1}% {}/{}", pct, sent, self.total_blocks)
    }

    /// Whether the remote has confirmed the full file.
    pub fn completed(&self) -> bool {
        self.state.borrow().completed
    }

    /// Parks until the next sent block, completion flip or failure.
    ///
    /// Surfaces the captured upload error if one is set when the caller
    /// wakes; otherwise returns the current progress.
    pub async fn wait_for_progress_update(&mut self) -> Result<f64> {
        self.state
            .changed()
            .await
            .map_err(|_| Error::ChannelClosed)?;
        let error = self.state.borrow_and_update().error.clone();
        if let Some(error) = error {
            return Err(Error::Upload(error));
        }
        Ok(self.progress())
    }

    /// Waits until the remote echo confirms the file.
    pub async fn wait_for_complete(&mut self) -> Result<()> {
        while !self.completed() {
            self.wait_for_progress_update().await?;
        }
        Ok(())
    }

    /// The source backing this upload.
    pub fn data_source(&self) -> &DataSource {
        &self.source
    }

    /// The index update that announced this upload.
    pub fn index_update(&self) -> &proto::IndexUpdate {
        &self.update
    }

    /// Releases the upload: stops the request dispatcher, lets in-flight
    /// responses finish, persists the announced record into the local
    /// index and, if requested at construction, closes the channel.
    pub async fn close(self) {
        debug!("closing upload process");
        let _ = self.shutdown.send(true);
        let _ = self.dispatcher.await;
        if let Some(listener) = self.echo_listener {
            let _ = listener.await;
        }
        if let Some(index) = &self.index {
            if let Some(file) = self.update.files.first() {
                let record = index.push_record(&self.update.folder, file);
                info!(folder = %record.folder, name = %record.name, sequence = record.sequence, "recorded announced file locally");
            }
        }
        if self.close_channel {
            self.channel.close();
        }
    }
}

/// Observer for a directory-create or delete announcement.
///
/// Completion tracks only the index-update write; there are no blocks to
/// serve.
pub struct IndexEditObserver {
    write: WriteState,
    update: proto::IndexUpdate,
    channel: Arc<dyn MessageChannel>,
    index: Option<Arc<dyn IndexStore>>,
    close_channel: bool,
}

enum WriteState {
    Pending(WriteHandle),
    Done,
    Failed(Arc<Error>),
}

impl IndexEditObserver {
    pub(crate) fn new(
        handle: WriteHandle,
        update: proto::IndexUpdate,
        channel: Arc<dyn MessageChannel>,
        index: Option<Arc<dyn IndexStore>>,
        close_channel: bool,
    ) -> Self {
        Self {
            write: WriteState::Pending(handle),
            update,
            channel,
            index,
            close_channel,
        }
    }

    /// The index update that announced this edit.
    pub fn index_update(&self) -> &proto::IndexUpdate {
        &self.update
    }

    /// Whether the announcement write has finished.
    ///
    /// A finished write that failed surfaces its error here, and on every
    /// later call.
    pub fn is_completed(&mut self) -> Result<bool> {
        match &mut self.write {
            WriteState::Pending(handle) => match handle.try_result() {
                None => Ok(false),
                Some(Ok(())) => {
                    self.write = WriteState::Done;
                    Ok(true)
                }
                Some(Err(error)) => {
                    let error = Arc::new(error);
                    self.write = WriteState::Failed(Arc::clone(&error));
                    Err(Error::Upload(error))
                }
            },
            WriteState::Done => Ok(true),
            WriteState::Failed(error) => Err(Error::Upload(Arc::clone(error))),
        }
    }

    /// Waits for the announcement to hit the wire.
    pub async fn wait_for_complete(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.write, WriteState::Done) {
            WriteState::Pending(handle) => match handle.wait().await {
                Ok(()) => Ok(()),
                Err(error) => {
                    let error = Arc::new(error);
                    self.write = WriteState::Failed(Arc::clone(&error));
                    Err(Error::Upload(error))
                }
            },
            WriteState::Done => Ok(()),
            WriteState::Failed(error) => {
                let result = Err(Error::Upload(Arc::clone(&error)));
                self.write = WriteState::Failed(error);
                result
            }
        }
    }

    /// Persists the announced record into the local index and, if
    /// requested at construction, closes the channel.
    pub fn close(self) {
        if let Some(index) = &self.index {
            if let Some(file) = self.update.files.first() {
                index.push_record(&self.update.folder, file);
            }
        }
        if self.close_channel {
            self.channel.close();
        }
    }
}
