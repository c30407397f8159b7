//! Enforcer
//!
//! Owns the client session, the policy and the handoff queue for the life of
//! the process, and wires them together:
//!
//! 1. the notification handler is registered and the client activated,
//! 2. the startup sequence cuts and rewires the monitored ports,
//! 3. the reconciler polls until shutdown is requested,
//! 4. the queue is closed (waking any blocked producer) and the client
//!    deactivated; dropping the enforcer closes the client.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use super::handler::{ConnectionEventHandler, OverflowPolicy};
use super::reconcile::Reconciler;
use super::rules::AllowList;
use crate::config::Config;
use crate::error::Result;
use crate::graph::GraphClient;
use crate::handoff::HandoffQueue;

pub struct Enforcer<C: GraphClient> {
    client: C,
    policy: Arc<AllowList>,
    queue: Arc<HandoffQueue>,
    poll_interval: Duration,
    active: bool,
}

impl<C: GraphClient> Enforcer<C> {
    /// Register the notification handler with `client` and activate it.
    pub fn new(mut client: C, config: &Config) -> Result<Self> {
        let policy = Arc::new(AllowList::new(
            config.monitored_ports.iter().cloned(),
            config.approved_destinations.iter().cloned(),
        )?);
        let queue = Arc::new(HandoffQueue::new(config.queue.capacity, config.queue.order));

        let handler = ConnectionEventHandler::new(
            client.port_names(),
            policy.clone(),
            queue.clone(),
            config.queue.overflow,
            config.enforce_on_disconnect,
        );
        // The handler runs on the service's notification thread. With
        // OverflowPolicy::Block it may wait there for a free queue slot.
        client.register_connection_handler(Arc::new(handler))?;
        client.activate()?;

        if config.queue.overflow == OverflowPolicy::Block {
            log::debug!("Notification handler blocks when the handoff queue is full");
        }
        log::info!(
            "Guarding {} port(s) with {} approved destination(s)",
            policy.monitored().len(),
            policy.approved().len()
        );

        Ok(Self {
            client,
            policy,
            queue,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            active: true,
        })
    }

    #[cfg(test)]
    pub fn policy(&self) -> &AllowList {
        &self.policy
    }

    #[cfg(test)]
    pub fn queue(&self) -> &HandoffQueue {
        &self.queue
    }

    fn reconciler(&self) -> Reconciler<'_, C> {
        Reconciler::new(&self.client, &self.policy, &self.queue, self.poll_interval)
    }

    /// Startup sequence followed by the poll loop. Returns once `running`
    /// is cleared.
    pub fn run(&self, running: &AtomicBool) {
        let mut reconciler = self.reconciler();
        let report = reconciler.startup();
        log::info!(
            "Canonical topology applied ({} of {} connections)",
            report.attempted - report.failed,
            report.attempted
        );
        reconciler.run(running);
    }

    /// Stop accepting notifications and release both semaphores.
    pub fn shutdown(&mut self) -> Result<()> {
        self.queue.close();
        if !self.queue.is_empty() {
            log::debug!("{} queued port(s) left unhandled", self.queue.len());
        }
        if self.active {
            self.active = false;
            self.client.deactivate()?;
        }
        log::info!("Stopped ({} dropped event(s))", self.queue.dropped());
        Ok(())
    }
}

impl<C: GraphClient> Drop for Enforcer<C> {
    fn drop(&mut self) {
        if self.active
            && let Err(e) = self.shutdown()
        {
            log::warn!("Shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::memory::MemoryGraph;
    use std::sync::atomic::Ordering;

    fn config() -> Config {
        Config {
            monitored_ports: vec!["mic:1".into(), "mic:2".into()],
            approved_destinations: vec!["daw:in_1".into(), "daw:in_2".into()],
            poll_interval_ms: 1,
            ..Config::default()
        }
    }

    fn graph() -> MemoryGraph {
        MemoryGraph::with_ports(&["mic:1", "mic:2", "daw:in_1", "daw:in_2", "app:in"])
    }

    #[test]
    fn test_new_activates_client() {
        let graph = graph();
        let enforcer = Enforcer::new(graph.clone(), &config()).unwrap();
        assert!(graph.is_active());
        assert_eq!(enforcer.policy().monitored().len(), 2);
        assert_eq!(enforcer.queue().capacity(), 256);
    }

    #[test]
    fn test_invalid_policy_is_fatal() {
        let mut config = config();
        config.monitored_ports.clear();
        assert!(matches!(
            Enforcer::new(graph(), &config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_notifications_reach_queue() {
        let graph = graph();
        let enforcer = Enforcer::new(graph.clone(), &config()).unwrap();
        graph.inject_connection("mic:1", "app:in");
        assert_eq!(enforcer.queue().len(), 1);
    }

    #[test]
    fn test_run_enforces_and_stops() {
        let graph = graph();
        graph.seed_link("mic:2", "app:in");
        let enforcer = Enforcer::new(graph.clone(), &config()).unwrap();

        let running = AtomicBool::new(false);
        enforcer.run(&running);
        assert!(!running.load(Ordering::SeqCst));
        assert_eq!(graph.peers_of("mic:1"), vec!["daw:in_1"]);
        assert_eq!(graph.peers_of("mic:2"), vec!["daw:in_2"]);
        assert!(enforcer.queue().is_empty());
    }

    #[test]
    fn test_shutdown_closes_queue_and_deactivates() {
        let graph = graph();
        let mut enforcer = Enforcer::new(graph.clone(), &config()).unwrap();
        enforcer.shutdown().unwrap();
        assert!(!graph.is_active());
        assert!(enforcer.queue().is_closed());
        // Further notifications are not delivered.
        graph.inject_connection("mic:1", "app:in");
        assert!(enforcer.queue().is_empty());
    }

    #[test]
    fn test_drop_deactivates() {
        let graph = graph();
        drop(Enforcer::new(graph.clone(), &config()).unwrap());
        assert!(!graph.is_active());
    }
}
