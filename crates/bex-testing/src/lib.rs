//! Shared test utilities for bex crates.
//!
//! Standardized doubles and builders used across the workspace test
//! suites:
//!
//! - [`channel`] - in-memory loopback message channel
//! - [`index`] - recording index store with scriptable remote echoes
//! - [`data`] - deterministic payloads, device ids and record builders

pub mod channel;
pub mod data;
pub mod index;

pub use channel::LoopbackChannel;
pub use index::MemoryIndexStore;
