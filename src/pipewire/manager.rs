use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

use libspa::utils::dict::DictRef;
use parking_lot::RwLock;
use pipewire::{
    context::ContextRc, link::Link as PwLink, main_loop::MainLoopRc, registry::GlobalObject,
    types::ObjectType,
};

use super::state::GraphState;
use super::types::*;
use crate::error::{Error, Result};
use crate::graph::{ConnectionEvent, ConnectionHandler};

const READY_TIMEOUT: Duration = Duration::from_secs(5);

type Ready = std::result::Result<(), String>;

/// State shared between the client handle and the PipeWire thread.
#[derive(Default)]
pub struct Shared {
    pub graph: Arc<GraphState>,
    pub handler: RwLock<Option<Arc<dyn ConnectionHandler>>>,
    pub active: AtomicBool,
}

impl Shared {
    /// Deliver a notification. Runs on the PipeWire thread.
    fn notify(&self, event: ConnectionEvent) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_connection(event);
        }
    }

    /// Drop every link on `port_id` from the mirror ahead of the server's
    /// removal, reporting each as disconnected. Commands are handled in
    /// order, so a `Connect` queued after this sees the links gone.
    fn detach_links(&self, port_id: ObjectId) -> Vec<Link> {
        let links = self.graph.links_for_port(port_id);
        for link in &links {
            self.graph.remove_link(link.id);
            self.notify(ConnectionEvent::new(
                link.output_port_id,
                link.input_port_id,
                false,
            ));
        }
        links
    }
}

/// Spawn the PipeWire thread and wait until the initial registry has been
/// mirrored into `shared.graph`.
pub fn start(
    shared: Arc<Shared>,
    client_name: &str,
) -> Result<(Sender<PwCommand>, JoinHandle<()>)> {
    let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
    let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Ready>(1);

    let thread = {
        let name = client_name.to_string();
        std::thread::Builder::new()
            .name("pipewire".to_string())
            .spawn(move || {
                if let Err(e) = run_pipewire_thread(shared, cmd_rx, &name, ready_tx.clone()) {
                    log::error!("PipeWire thread error: {}", e);
                    let _ = ready_tx.try_send(Err(e.to_string()));
                }
            })?
    };

    let open_error = |reason: String| Error::ClientOpen {
        name: client_name.to_string(),
        reason,
    };

    match ready_rx.recv_timeout(READY_TIMEOUT) {
        Ok(Ok(())) => Ok((cmd_tx, thread)),
        Ok(Err(reason)) => {
            let _ = thread.join();
            Err(open_error(reason))
        }
        Err(_) => {
            let _ = cmd_tx.send(PwCommand::Shutdown);
            if thread.join().is_err() {
                log::error!("PipeWire thread panicked");
            }
            Err(open_error("timed out waiting for the PipeWire registry".to_string()))
        }
    }
}

fn run_pipewire_thread(
    shared: Arc<Shared>,
    cmd_rx: Receiver<PwCommand>,
    client_name: &str,
    ready_tx: SyncSender<Ready>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    pipewire::init();

    let mainloop = MainLoopRc::new(None)?;
    let context = ContextRc::new(&mainloop, None)?;
    let core = context.connect_rc(Some(pipewire::properties::properties! {
        *pipewire::keys::APP_NAME => client_name,
    }))?;
    let registry = core.get_registry_rc()?;

    let _registry_listener = registry
        .add_listener_local()
        .global({
            let shared = shared.clone();

            move |global| match global.type_ {
                ObjectType::Node => {
                    if let Some(node) = parse_node(global) {
                        shared.graph.insert_node(node);
                    }
                }
                ObjectType::Port => {
                    if let Some(port) = parse_port(global, &shared.graph) {
                        log::debug!(
                            "Port registered: id={} name={:?} dir={:?}",
                            port.id,
                            port.full_name,
                            port.direction
                        );
                        shared.graph.insert_port(port);
                    }
                }
                ObjectType::Link => {
                    if let Some(link) = parse_link_from_props(global) {
                        let event =
                            ConnectionEvent::new(link.output_port_id, link.input_port_id, true);
                        shared.graph.insert_link(link);
                        shared.notify(event);
                    }
                }
                _ => {}
            }
        })
        .global_remove({
            let shared = shared.clone();

            move |id| {
                if shared.graph.remove_node(id).is_some() {
                    shared.graph.cleanup_node(id);
                } else if let Some(link) = shared.graph.remove_link(id) {
                    shared.notify(ConnectionEvent::new(
                        link.output_port_id,
                        link.input_port_id,
                        false,
                    ));
                } else {
                    shared.graph.remove_port(id);
                }
            }
        })
        .register();

    // Globals that exist now are announced before this roundtrip completes.
    let pending = core.sync(0)?;
    let _core_listener = core
        .add_listener_local()
        .done({
            let ready_tx = RefCell::new(Some(ready_tx));
            move |id, seq| {
                if id == pipewire::core::PW_ID_CORE
                    && seq == pending
                    && let Some(tx) = ready_tx.borrow_mut().take()
                {
                    let _ = tx.try_send(Ok(()));
                }
            }
        })
        .error(|id, seq, res, message| {
            log::warn!("PipeWire error: id={} seq={} res={}: {}", id, seq, res, message);
        })
        .register();

    let (pw_cmd_tx, pw_cmd_rx) = pipewire::channel::channel();
    std::thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            if pw_cmd_tx.send(cmd).is_err() {
                break;
            }
        }
    });

    let _cmd_receiver = pw_cmd_rx.attach(mainloop.loop_(), {
        let shared = shared.clone();
        let core = core.clone();
        let registry = registry.clone();
        let mainloop = mainloop.clone();

        move |cmd| match cmd {
            PwCommand::Connect {
                output_port_id,
                input_port_id,
            } => {
                if shared.graph.find_link(output_port_id, input_port_id).is_none() {
                    create_link(&shared.graph, &core, output_port_id, input_port_id);
                }
            }
            PwCommand::DisconnectAll { port_id } => {
                for link in shared.detach_links(port_id) {
                    log::debug!(
                        "Destroying link {} (node {} port {} -> node {} port {})",
                        link.id,
                        link.output_node_id,
                        link.output_port_id,
                        link.input_node_id,
                        link.input_port_id
                    );
                    if let Err(e) = registry.destroy_global(link.id).into_result() {
                        log::warn!("Failed to destroy link {}: {}", link.id, e);
                        shared.graph.insert_link(link);
                    }
                }
            }
            PwCommand::Shutdown => mainloop.quit(),
        }
    });

    log::info!("PipeWire thread started");
    mainloop.run();
    log::info!("PipeWire thread stopped");

    Ok(())
}

fn parse_node(global: &GlobalObject<&DictRef>) -> Option<Node> {
    let props = global.props.as_ref()?;

    Some(Node {
        id: global.id,
        name: props.get("node.name")?.to_string(),
    })
}

fn parse_port(global: &GlobalObject<&DictRef>, graph: &GraphState) -> Option<Port> {
    let props = global.props.as_ref()?;

    let node_id: ObjectId = match props.get("node.id").map(str::parse::<ObjectId>) {
        Some(Ok(id)) => id,
        _ => {
            log::debug!("Port {}: missing or invalid node.id", global.id);
            return None;
        }
    };
    let name = props.get("port.name").unwrap_or_default().to_string();

    let direction = match props.get("port.direction") {
        Some("in") => PortDirection::Input,
        Some("out") => PortDirection::Output,
        other => {
            log::debug!(
                "Port {} (node {}): unusable port.direction {:?}",
                global.id,
                node_id,
                other
            );
            return None;
        }
    };

    // Until the node shows up, its id stands in for its name.
    let node_name = graph
        .get_node(node_id)
        .map(|n| n.name)
        .unwrap_or_else(|| node_id.to_string());

    Some(Port {
        id: global.id,
        node_id,
        full_name: Port::full_name(&node_name, &name),
        name,
        direction,
    })
}

fn parse_link_from_props(global: &GlobalObject<&DictRef>) -> Option<Link> {
    let props = global.props.as_ref()?;

    Some(Link {
        id: global.id,
        output_node_id: props.get("link.output.node")?.parse().ok()?,
        output_port_id: props.get("link.output.port")?.parse().ok()?,
        input_node_id: props.get("link.input.node")?.parse().ok()?,
        input_port_id: props.get("link.input.port")?.parse().ok()?,
    })
}

fn create_link(
    graph: &GraphState,
    core: &pipewire::core::CoreRc,
    output_port_id: ObjectId,
    input_port_id: ObjectId,
) {
    let output_port = match graph.get_port(output_port_id) {
        Some(p) if p.direction == PortDirection::Output => p,
        _ => {
            log::warn!("Invalid output port {}", output_port_id);
            return;
        }
    };

    let input_port = match graph.get_port(input_port_id) {
        Some(p) if p.direction == PortDirection::Input => p,
        _ => {
            log::warn!("Invalid input port {}", input_port_id);
            return;
        }
    };

    log::debug!(
        "Creating link {} -> {}",
        output_port.full_name,
        input_port.full_name
    );

    let props = pipewire::properties::properties! {
        *pipewire::keys::LINK_OUTPUT_NODE => output_port.node_id.to_string(),
        *pipewire::keys::LINK_OUTPUT_PORT => output_port_id.to_string(),
        *pipewire::keys::LINK_INPUT_NODE => input_port.node_id.to_string(),
        *pipewire::keys::LINK_INPUT_PORT => input_port_id.to_string(),
        *pipewire::keys::OBJECT_LINGER => "true",
    };

    if let Err(e) = core.create_object::<PwLink>("link-factory", &props) {
        log::error!("Failed to create link: {}", e);
    }
}
