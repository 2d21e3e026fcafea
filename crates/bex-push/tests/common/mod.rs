//! Common helpers for push-engine tests.

use std::sync::Arc;

use bex_core::{AtomicSequencer, DeviceConfig};
use bex_push::{proto, Pusher};
use bex_testing::{data, LoopbackChannel, MemoryIndexStore};

pub const FOLDER: &str = "default";

/// One engine wired to in-memory doubles.
pub struct Harness {
    pub channel: Arc<LoopbackChannel>,
    pub index: Arc<MemoryIndexStore>,
    pub config: DeviceConfig,
    pub pusher: Pusher,
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with_floor(0)
}

/// Harness whose sequencer starts allocating at `floor + 1`.
pub fn harness_with_floor(floor: u64) -> Harness {
    let channel = Arc::new(LoopbackChannel::new([FOLDER]));
    let index = Arc::new(MemoryIndexStore::new());
    let config = data::test_config(1);
    let pusher = Pusher::new(
        config.clone(),
        channel.clone(),
        Arc::new(AtomicSequencer::new(floor)),
    )
    .with_index(index.clone());
    Harness {
        channel,
        index,
        config,
        pusher,
    }
}

/// Builds the request a remote would issue for one announced block.
#[allow(dead_code)]
pub fn request_for(update: &proto::IndexUpdate, block_index: usize) -> proto::Request {
    let file = &update.files[0];
    let block = &file.blocks[block_index];
    proto::Request {
        id: block_index as i32,
        folder: update.folder.clone(),
        name: file.name.clone(),
        offset: block.offset,
        size: block.size,
        hash: block.hash.clone(),
    }
}
