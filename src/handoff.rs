//! Realtime-to-control-thread handoff.
//!
//! The notification handler is the single producer, the reconciler the single
//! consumer. Two counting semaphores pair every acquired slot with exactly one
//! produced item.

mod queue;
mod semaphore;

pub use queue::{HandoffQueue, QueueOrder};

