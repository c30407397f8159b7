use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::*;
use crate::graph::PortNames;

/// Mirror of the PipeWire registry, written by the PipeWire thread and read
/// by the control thread and the notification handler.
#[derive(Debug, Default)]
pub struct GraphState {
    nodes: RwLock<HashMap<ObjectId, Node>>,
    ports: RwLock<HashMap<ObjectId, Port>>,
    links: RwLock<HashMap<ObjectId, Link>>,
}

impl GraphState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_node(&self, node: Node) {
        let node_id = node.id;
        let name = node.name.clone();
        self.nodes.write().insert(node_id, node);

        // Ports announced before their node carry a placeholder name
        let mut ports = self.ports.write();
        for port in ports.values_mut() {
            if port.node_id == node_id {
                port.full_name = Port::full_name(&name, &port.name);
            }
        }
    }

    pub fn remove_node(&self, id: ObjectId) -> Option<Node> {
        self.nodes.write().remove(&id)
    }

    pub fn get_node(&self, id: ObjectId) -> Option<Node> {
        self.nodes.read().get(&id).cloned()
    }

    pub fn insert_port(&self, port: Port) {
        self.ports.write().insert(port.id, port);
    }

    pub fn remove_port(&self, id: ObjectId) -> Option<Port> {
        self.ports.write().remove(&id)
    }

    pub fn get_port(&self, id: ObjectId) -> Option<Port> {
        self.ports.read().get(&id).cloned()
    }

    pub fn find_port_by_name(&self, full_name: &str) -> Option<Port> {
        self.ports
            .read()
            .values()
            .find(|p| p.full_name == full_name)
            .cloned()
    }

    pub fn insert_link(&self, link: Link) {
        self.links.write().insert(link.id, link);
    }

    pub fn remove_link(&self, id: ObjectId) -> Option<Link> {
        self.links.write().remove(&id)
    }

    pub fn find_link(&self, output_port_id: ObjectId, input_port_id: ObjectId) -> Option<Link> {
        self.links
            .read()
            .values()
            .find(|l| l.output_port_id == output_port_id && l.input_port_id == input_port_id)
            .cloned()
    }

    /// Every link with `port_id` on either end.
    pub fn links_for_port(&self, port_id: ObjectId) -> Vec<Link> {
        self.links
            .read()
            .values()
            .filter(|l| l.output_port_id == port_id || l.input_port_id == port_id)
            .cloned()
            .collect()
    }

    pub fn cleanup_node(&self, node_id: ObjectId) {
        let port_ids: Vec<ObjectId> = self
            .ports
            .read()
            .values()
            .filter(|p| p.node_id == node_id)
            .map(|p| p.id)
            .collect();

        {
            let mut links = self.links.write();
            links.retain(|_, l| {
                !port_ids.contains(&l.output_port_id) && !port_ids.contains(&l.input_port_id)
            });
        }

        {
            let mut ports = self.ports.write();
            for port_id in port_ids {
                ports.remove(&port_id);
            }
        }
    }
}

impl PortNames for GraphState {
    fn with_port_name<R>(&self, id: ObjectId, f: impl FnOnce(&str) -> R) -> Option<R> {
        self.ports.read().get(&id).map(|p| f(&p.full_name))
    }
}
