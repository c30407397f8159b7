//! Connection notification filter.
//!
//! Runs on the audio graph service's thread. It only compares names and
//! queues the offending monitored port; disconnecting is left to the
//! reconciler on the control thread.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::rules::AllowList;
use crate::graph::{ConnectionEvent, ConnectionHandler, PortNames};
use crate::handoff::HandoffQueue;

/// What the handler does when the handoff queue has no free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for the reconciler to free a slot
    #[default]
    Block,
    /// Wait at most this many milliseconds, then drop
    Timeout(u64),
    /// Drop immediately
    Drop,
}

pub struct ConnectionEventHandler<N> {
    names: Arc<N>,
    policy: Arc<AllowList>,
    queue: Arc<HandoffQueue>,
    overflow: OverflowPolicy,
    /// When false, removal notifications are ignored
    enforce_on_disconnect: bool,
}

impl<N: PortNames> ConnectionEventHandler<N> {
    pub fn new(
        names: Arc<N>,
        policy: Arc<AllowList>,
        queue: Arc<HandoffQueue>,
        overflow: OverflowPolicy,
        enforce_on_disconnect: bool,
    ) -> Self {
        Self {
            names,
            policy,
            queue,
            overflow,
            enforce_on_disconnect,
        }
    }

    /// True if `event` links a monitored port to something not approved.
    pub fn is_violation(&self, event: &ConnectionEvent) -> bool {
        if !event.connected && !self.enforce_on_disconnect {
            return false;
        }

        let monitored = self
            .names
            .with_port_name(event.source, |name| self.policy.is_monitored(name))
            .unwrap_or(false);
        if !monitored {
            return false;
        }

        // A destination that vanished cannot be checked; reconciling is harmless.
        let approved = self
            .names
            .with_port_name(event.dest, |name| self.policy.is_approved(name))
            .unwrap_or(false);
        !approved
    }
}

impl<N: PortNames> ConnectionHandler for ConnectionEventHandler<N> {
    fn on_connection(&self, event: ConnectionEvent) {
        if !self.is_violation(&event) {
            return;
        }
        // Failures are counted by the queue and reported from the control thread.
        let _ = match self.overflow {
            OverflowPolicy::Block => self.queue.enqueue(event.source),
            OverflowPolicy::Timeout(ms) => self
                .queue
                .enqueue_timeout(event.source, Duration::from_millis(ms)),
            OverflowPolicy::Drop => self.queue.try_enqueue(event.source),
        };
    }
}
