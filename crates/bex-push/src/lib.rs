//! Outbound block-exchange engine for a bex peer.
//!
//! Given a local file, directory or deletion, the engine announces the
//! change over an established peer channel and serves the resulting
//! block requests until the remote has reconstructed the file. Transport,
//! framing and device authentication are collaborators behind the
//! [`MessageChannel`] trait; the local index is behind [`IndexStore`].

pub mod channel;
pub mod convert;
pub mod index;
pub mod observer;
pub mod proto;

mod error;
mod pusher;
mod request;

pub use channel::{MessageChannel, OutboundMessage, WriteHandle, WriteSlot};
pub use error::Error;
pub use index::{IndexEvent, IndexStore};
pub use observer::{FileUploadObserver, IndexEditObserver};
pub use pusher::Pusher;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
