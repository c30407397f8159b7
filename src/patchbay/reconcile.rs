//! Control-thread side of the handoff.
//!
//! Drains rejected ports, cuts every link on each, and reapplies the whole
//! canonical topology. Lookup failures are expected while devices come and
//! go; they are logged and skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::reconnect::{ApplyReport, ReconnectPolicy};
use super::rules::AllowList;
use crate::error::Error;
use crate::graph::{AudioGraph, PortId};
use crate::handoff::HandoffQueue;

pub struct Reconciler<'a, G: ?Sized> {
    graph: &'a G,
    policy: &'a AllowList,
    queue: &'a HandoffQueue,
    poll_interval: Duration,
    reported_drops: u64,
}

impl<'a, G: AudioGraph + ?Sized> Reconciler<'a, G> {
    pub fn new(
        graph: &'a G,
        policy: &'a AllowList,
        queue: &'a HandoffQueue,
        poll_interval: Duration,
    ) -> Self {
        Self {
            graph,
            policy,
            queue,
            poll_interval,
            reported_drops: 0,
        }
    }

    /// Cut every existing link on the monitored ports, then wire the
    /// canonical topology once.
    pub fn startup(&mut self) -> ApplyReport {
        for name in self.policy.monitored() {
            match self.graph.lookup_port_by_name(name) {
                Some(id) => self.disconnect(id),
                None => log::warn!("Failed to find port with name {}", name),
            }
        }
        self.reconnect()
    }

    /// Handle everything queued so far. Returns how many ports were handled.
    pub fn drain_once(&mut self) -> usize {
        let mut handled = 0;
        while let Some(id) = self.queue.try_dequeue() {
            log::info!("Rejected connection on port {}, restoring topology", id);
            self.disconnect(id);
            self.reconnect();
            handled += 1;
        }
        self.report_drops();
        handled
    }

    /// Drain, then sleep, until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        log::info!(
            "Reconciling every {} ms (queue capacity {}, {:?})",
            self.poll_interval.as_millis(),
            self.queue.capacity(),
            self.queue.order()
        );
        while running.load(Ordering::SeqCst) {
            self.drain_once();
            std::thread::sleep(self.poll_interval);
        }
        // Anything queued during the last sleep
        self.drain_once();
    }

    fn disconnect(&self, id: PortId) {
        if !self.graph.port_exists(id) {
            log::debug!("Port {} is gone, nothing to disconnect", id);
            return;
        }
        match self.graph.disconnect_all(id) {
            Ok(()) => {}
            Err(Error::PortNotFound(_)) => log::debug!("Port {} vanished before disconnect", id),
            Err(e) => log::warn!("Failed to disconnect port {}: {}", id, e),
        }
    }

    fn reconnect(&self) -> ApplyReport {
        let report = ReconnectPolicy::new(self.policy).apply(self.graph);
        if report.failed > 0 {
            log::warn!(
                "{} of {} canonical connections failed, retrying on next rejection",
                report.failed,
                report.attempted
            );
        }
        report
    }

    fn report_drops(&mut self) {
        let dropped = self.queue.dropped();
        if dropped > self.reported_drops {
            log::warn!(
                "Handoff queue full: {} rejected connection(s) dropped ({} total)",
                dropped - self.reported_drops,
                dropped
            );
            self.reported_drops = dropped;
        }
    }
}
