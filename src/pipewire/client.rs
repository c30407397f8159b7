use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

use super::manager::{self, Shared};
use super::state::GraphState;
use super::types::*;
use crate::error::{Error, Result};
use crate::graph::{AudioGraph, ConnectionHandler, GraphClient, PortId};

/// Client session with the PipeWire daemon.
///
/// Commands are forwarded to the PipeWire thread; lookups read the mirrored
/// registry directly.
pub struct PipeWireClient {
    name: String,
    shared: Arc<Shared>,
    cmd_tx: Sender<PwCommand>,
    thread: Option<JoinHandle<()>>,
}

impl PipeWireClient {
    /// Connect to PipeWire as `name`. Returns once the current graph is
    /// known, so the startup sequence can resolve ports immediately.
    pub fn open(name: &str) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let (cmd_tx, thread) = manager::start(shared.clone(), name)?;
        log::info!("Connected to PipeWire as '{}'", name);

        Ok(Self {
            name: name.to_string(),
            shared,
            cmd_tx,
            thread: Some(thread),
        })
    }

    #[cfg(test)]
    fn detached(shared: Arc<Shared>, cmd_tx: Sender<PwCommand>) -> Self {
        Self {
            name: "test".to_string(),
            shared,
            cmd_tx,
            thread: None,
        }
    }

    fn send(&self, cmd: PwCommand) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| Error::Disconnected)
    }

    fn port(&self, name: &str) -> Result<Port> {
        self.shared
            .graph
            .find_port_by_name(name)
            .ok_or_else(|| Error::PortNotFound(name.to_string()))
    }
}

impl AudioGraph for PipeWireClient {
    fn lookup_port_by_name(&self, name: &str) -> Option<PortId> {
        self.shared.graph.find_port_by_name(name).map(|p| p.id)
    }

    fn port_exists(&self, id: PortId) -> bool {
        self.shared.graph.get_port(id).is_some()
    }

    fn disconnect_all(&self, port: PortId) -> Result<()> {
        if !self.port_exists(port) {
            return Err(Error::PortNotFound(port.to_string()));
        }
        self.send(PwCommand::DisconnectAll { port_id: port })
    }

    /// Existing links are skipped on the PipeWire thread, after any
    /// disconnect sent before this has been applied to the mirror.
    fn connect(&self, output: &str, input: &str) -> Result<()> {
        let output_port = self.port(output)?;
        let input_port = self.port(input)?;

        self.send(PwCommand::Connect {
            output_port_id: output_port.id,
            input_port_id: input_port.id,
        })
    }
}

impl GraphClient for PipeWireClient {
    type Names = GraphState;

    fn port_names(&self) -> Arc<GraphState> {
        self.shared.graph.clone()
    }

    fn register_connection_handler(&mut self, handler: Arc<dyn ConnectionHandler>) -> Result<()> {
        *self.shared.handler.write() = Some(handler);
        Ok(())
    }

    fn activate(&mut self) -> Result<()> {
        if self.thread.as_ref().is_none_or(|t| t.is_finished()) {
            return Err(Error::Activation("PipeWire thread is not running".into()));
        }
        self.shared.active.store(true, Ordering::Release);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        self.shared.active.store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for PipeWireClient {
    fn drop(&mut self) {
        self.shared.active.store(false, Ordering::Release);
        let _ = self.cmd_tx.send(PwCommand::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("PipeWire thread panicked");
        }
        log::info!("Closed PipeWire client '{}'", self.name);
    }
}
