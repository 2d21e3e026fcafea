//! The outbound message channel and its write-completion handles.
//!
//! The engine talks to exactly one remote peer over an established,
//! authenticated, framed channel. Framing and transport live elsewhere;
//! this trait is the narrow surface the engine needs: non-blocking FIFO
//! sends that return a completion handle, an inbound-request
//! subscription, and folder membership.

use tokio::sync::{broadcast, oneshot};

use crate::proto;
use crate::{Error, Result};

/// A message the engine can place on the wire.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    IndexUpdate(proto::IndexUpdate),
    Response(proto::Response),
}

/// Completion handle for one enqueued write.
///
/// Obtained synchronously from [`MessageChannel::send`]; resolves once the
/// message has been written to the wire, or has failed to be.
#[derive(Debug)]
pub struct WriteHandle {
    rx: oneshot::Receiver<Result<()>>,
}

impl WriteHandle {
    /// Creates an unresolved handle and the slot the channel resolves it
    /// with.
    pub fn pending() -> (WriteSlot, WriteHandle) {
        let (tx, rx) = oneshot::channel();
        (WriteSlot { tx }, WriteHandle { rx })
    }

    /// Creates an already-resolved handle.
    pub fn ready(result: Result<()>) -> WriteHandle {
        let (slot, handle) = Self::pending();
        slot.resolve(result);
        handle
    }

    /// Waits for the write to complete.
    ///
    /// A dropped [`WriteSlot`] counts as a closed channel.
    pub async fn wait(self) -> Result<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::ChannelClosed),
        }
    }

    /// Polls for completion without waiting.
    ///
    /// Returns `None` while the write is still in flight.
    pub fn try_result(&mut self) -> Option<Result<()>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::ChannelClosed)),
        }
    }
}

/// Resolver half of a [`WriteHandle`].
#[derive(Debug)]
pub struct WriteSlot {
    tx: oneshot::Sender<Result<()>>,
}

impl WriteSlot {
    /// Resolves the paired handle. The result is dropped if the handle is
    /// already gone.
    pub fn resolve(self, result: Result<()>) {
        let _ = self.tx.send(result);
    }
}

/// One established, authenticated channel to a remote peer.
///
/// Implementations must be thread-safe and preserve FIFO write order per
/// peer; the engine relies on the index update reaching the remote before
/// any block response.
pub trait MessageChannel: Send + Sync + 'static {
    /// Enqueues a message and returns its completion handle.
    ///
    /// Must not block on the wire.
    fn send(&self, message: OutboundMessage) -> WriteHandle;

    /// Subscribes to inbound block requests.
    fn subscribe_requests(&self) -> broadcast::Receiver<proto::Request>;

    /// Whether the remote shares `folder` with us.
    fn has_folder(&self, folder: &str) -> bool;

    /// Closes the underlying connection.
    fn close(&self);
}
