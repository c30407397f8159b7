//! In-memory audio graph for tests.
//!
//! Notifications are delivered synchronously on the caller's thread, after
//! the internal lock is released, so a handler may resolve names re-entrantly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::types::*;
use crate::error::{Error, Result};

/// A command the core issued against the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphOp {
    DisconnectAll(String),
    Connect(String, String),
}

#[derive(Default)]
struct Inner {
    ports: Vec<(PortId, String)>,
    links: Vec<(PortId, PortId)>,
    ops: Vec<GraphOp>,
    next_id: PortId,
}

impl Inner {
    fn name_of(&self, id: PortId) -> Option<&str> {
        self.ports
            .iter()
            .find(|(p, _)| *p == id)
            .map(|(_, n)| n.as_str())
    }

    fn id_of(&self, name: &str) -> Option<PortId> {
        self.ports.iter().find(|(_, n)| n == name).map(|(p, _)| *p)
    }
}

#[derive(Clone, Default)]
pub struct MemoryGraph {
    inner: Arc<Mutex<Inner>>,
    handler: Arc<RwLock<Option<Arc<dyn ConnectionHandler>>>>,
    active: Arc<AtomicBool>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports(names: &[&str]) -> Self {
        let graph = Self::new();
        for name in names {
            graph.add_port(name);
        }
        graph
    }

    pub fn add_port(&self, name: &str) -> PortId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.ports.push((id, name.to_string()));
        id
    }

    /// Remove a port and its links without notifying, like a device unplug
    /// seen after the fact.
    pub fn remove_port(&self, id: PortId) {
        let mut inner = self.inner.lock();
        inner.ports.retain(|(p, _)| *p != id);
        inner.links.retain(|(a, b)| *a != id && *b != id);
    }

    /// Create a link that existed before this client was activated.
    pub fn seed_link(&self, output: &str, input: &str) {
        let mut inner = self.inner.lock();
        if let (Some(a), Some(b)) = (inner.id_of(output), inner.id_of(input))
            && !inner.links.contains(&(a, b))
        {
            inner.links.push((a, b));
        }
    }

    /// Simulate another application creating a link. Not recorded as a
    /// command of ours.
    pub fn inject_connection(&self, output: &str, input: &str) {
        let event = {
            let mut inner = self.inner.lock();
            match (inner.id_of(output), inner.id_of(input)) {
                (Some(a), Some(b)) if !inner.links.contains(&(a, b)) => {
                    inner.links.push((a, b));
                    Some(ConnectionEvent::new(a, b, true))
                }
                _ => None,
            }
        };
        self.notify(event);
    }

    pub fn ops(&self) -> Vec<GraphOp> {
        self.inner.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.inner.lock().ops.clear();
    }

    /// Sorted names of every port linked to `name`.
    pub fn peers_of(&self, name: &str) -> Vec<String> {
        let inner = self.inner.lock();
        let Some(id) = inner.id_of(name) else {
            return Vec::new();
        };
        let mut peers: Vec<String> = inner
            .links
            .iter()
            .filter_map(|&(a, b)| match (a == id, b == id) {
                (true, _) => inner.name_of(b),
                (_, true) => inner.name_of(a),
                _ => None,
            })
            .map(String::from)
            .collect();
        peers.sort();
        peers
    }

    pub fn links(&self) -> Vec<(String, String)> {
        let inner = self.inner.lock();
        let mut links: Vec<(String, String)> = inner
            .links
            .iter()
            .filter_map(|&(a, b)| Some((inner.name_of(a)?.to_string(), inner.name_of(b)?.to_string())))
            .collect();
        links.sort();
        links
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn notify(&self, events: impl IntoIterator<Item = ConnectionEvent>) {
        if !self.is_active() {
            return;
        }
        let handler = self.handler.read().clone();
        if let Some(handler) = handler {
            for event in events {
                handler.on_connection(event);
            }
        }
    }
}

impl PortNames for MemoryGraph {
    fn with_port_name<R>(&self, id: PortId, f: impl FnOnce(&str) -> R) -> Option<R> {
        let inner = self.inner.lock();
        inner.name_of(id).map(f)
    }
}

impl AudioGraph for MemoryGraph {
    fn lookup_port_by_name(&self, name: &str) -> Option<PortId> {
        self.inner.lock().id_of(name)
    }

    fn port_exists(&self, id: PortId) -> bool {
        self.inner.lock().name_of(id).is_some()
    }

    fn disconnect_all(&self, port: PortId) -> Result<()> {
        let removed: Vec<ConnectionEvent> = {
            let mut inner = self.inner.lock();
            let name = inner
                .name_of(port)
                .map(String::from)
                .ok_or_else(|| Error::PortNotFound(port.to_string()))?;
            inner.ops.push(GraphOp::DisconnectAll(name));
            let links = std::mem::take(&mut inner.links);
            let (gone, kept): (Vec<_>, Vec<_>) = links
                .into_iter()
                .partition(|&(a, b)| a == port || b == port);
            inner.links = kept;
            gone.into_iter()
                .map(|(a, b)| ConnectionEvent::new(a, b, false))
                .collect()
        };
        self.notify(removed);
        Ok(())
    }

    fn connect(&self, output: &str, input: &str) -> Result<()> {
        let event = {
            let mut inner = self.inner.lock();
            let a = inner
                .id_of(output)
                .ok_or_else(|| Error::PortNotFound(output.to_string()))?;
            let b = inner
                .id_of(input)
                .ok_or_else(|| Error::PortNotFound(input.to_string()))?;
            inner
                .ops
                .push(GraphOp::Connect(output.to_string(), input.to_string()));
            if inner.links.contains(&(a, b)) {
                None
            } else {
                inner.links.push((a, b));
                Some(ConnectionEvent::new(a, b, true))
            }
        };
        self.notify(event);
        Ok(())
    }
}

impl GraphClient for MemoryGraph {
    type Names = MemoryGraph;

    fn port_names(&self) -> Arc<Self::Names> {
        Arc::new(self.clone())
    }

    fn register_connection_handler(&mut self, handler: Arc<dyn ConnectionHandler>) -> Result<()> {
        *self.handler.write() = Some(handler);
        Ok(())
    }

    fn activate(&mut self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}
