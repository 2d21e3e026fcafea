//! In-memory message channel for exercising the push engine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;

use bex_push::channel::{MessageChannel, OutboundMessage, WriteHandle};
use bex_push::{proto, Error};

/// In-memory loopback channel.
///
/// Records every outbound message in order, resolves write handles
/// immediately (success by default, scripted failures on demand) and lets
/// tests inject inbound requests as if the remote had sent them.
pub struct LoopbackChannel {
    folders: Vec<String>,
    sent: Mutex<Vec<OutboundMessage>>,
    /// Number of upcoming Response writes to fail.
    fail_responses: AtomicUsize,
    requests: broadcast::Sender<proto::Request>,
    closed: AtomicBool,
}

impl LoopbackChannel {
    pub fn new(folders: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let (requests, _) = broadcast::channel(64);
        Self {
            folders: folders.into_iter().map(Into::into).collect(),
            sent: Mutex::new(Vec::new()),
            fail_responses: AtomicUsize::new(0),
            requests,
            closed: AtomicBool::new(false),
        }
    }

    /// Makes the next `count` Response writes resolve with a write error.
    pub fn fail_next_response_writes(&self, count: usize) {
        self.fail_responses.store(count, Ordering::SeqCst);
    }

    /// Injects an inbound request.
    pub fn push_request(&self, request: proto::Request) {
        let _ = self.requests.send(request);
    }

    /// Snapshot of everything sent so far, in order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("sent log poisoned").clone()
    }

    pub fn sent_index_updates(&self) -> Vec<proto::IndexUpdate> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::IndexUpdate(update) => Some(update),
                OutboundMessage::Response(_) => None,
            })
            .collect()
    }

    pub fn sent_responses(&self) -> Vec<proto::Response> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                OutboundMessage::Response(response) => Some(response),
                OutboundMessage::IndexUpdate(_) => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.fail_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl MessageChannel for LoopbackChannel {
    fn send(&self, message: OutboundMessage) -> WriteHandle {
        let fail = matches!(message, OutboundMessage::Response(_)) && self.take_failure();
        self.sent.lock().expect("sent log poisoned").push(message);
        if fail {
            WriteHandle::ready(Err(Error::Write("scripted write failure".to_string())))
        } else {
            WriteHandle::ready(Ok(()))
        }
    }

    fn subscribe_requests(&self) -> broadcast::Receiver<proto::Request> {
        self.requests.subscribe()
    }

    fn has_folder(&self, folder: &str) -> bool {
        self.folders.iter().any(|f| f == folder)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
