//! Inbound request dispatch for an active upload.
//!
//! One task owns the request subscription; matching requests are handed
//! to blocking workers so a slow disk read never stalls delivery of
//! further channel events. Requests for other uploads are left for their
//! own subscribers.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use bex_core::DataSource;

use crate::channel::{MessageChannel, OutboundMessage};
use crate::observer::{record_failure, UploadState};
use crate::{proto, Error};

/// Everything a dispatch loop needs to serve one upload.
pub(crate) struct RequestServer {
    pub channel: Arc<dyn MessageChannel>,
    pub source: Arc<DataSource>,
    pub folder: String,
    pub name: String,
    pub state: Arc<watch::Sender<UploadState>>,
}

/// Spawns the dispatch loop for one upload.
///
/// The loop exits when shutdown is signalled, when the observer is
/// dropped, or when the channel stops delivering requests; in-flight
/// workers are always drained before the task finishes.
pub(crate) fn spawn(
    server: RequestServer,
    mut requests: broadcast::Receiver<proto::Request>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut workers = JoinSet::new();
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // a dropped shutdown handle counts as a shutdown signal
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                request = requests.recv() => match request {
                    Ok(request) => server.dispatch(request, &mut workers),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "request subscription lagged, remote will re-request");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        while workers.join_next().await.is_some() {}
    })
}

impl RequestServer {
    fn dispatch(&self, request: proto::Request, workers: &mut JoinSet<()>) {
        if request.folder != self.folder || request.name != self.name {
            return;
        }
        let hash = hex::encode(&request.hash);
        debug!(
            name = %request.name,
            offset = request.offset,
            size = request.size,
            %hash,
            "handling block request"
        );
        let channel = Arc::clone(&self.channel);
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        workers.spawn(serve(channel, source, state, request, hash));
    }
}

/// Reads one block and answers the request; outcomes land in the shared
/// upload state rather than propagating.
async fn serve(
    channel: Arc<dyn MessageChannel>,
    source: Arc<DataSource>,
    state: Arc<watch::Sender<UploadState>>,
    request: proto::Request,
    hash: String,
) {
    let offset = request.offset as u64;
    let size = request.size as usize;
    let read = {
        let source = Arc::clone(&source);
        let expected = hash.clone();
        tokio::task::spawn_blocking(move || source.block(offset, size, &expected)).await
    };
    let data = match read {
        Ok(Ok(data)) => data,
        Ok(Err(error)) => return fail(&state, &hash, Error::Source(error)),
        Err(join_error) => return fail(&state, &hash, Error::Worker(join_error.to_string())),
    };
    let handle = channel.send(OutboundMessage::Response(proto::Response {
        id: request.id,
        data,
        code: proto::ErrorCode::NoError as i32,
    }));
    match handle.wait().await {
        Ok(()) => state.send_modify(|s| {
            s.sent_blocks.insert(hash);
        }),
        Err(error) => fail(&state, &hash, error),
    }
}

fn fail(state: &watch::Sender<UploadState>, hash: &str, error: Error) {
    warn!(%hash, %error, "block upload failed");
    record_failure(state, error);
}
