/// Unique identifier for PipeWire objects
pub type ObjectId = u32;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// A PipeWire node (device or application)
#[derive(Debug, Clone)]
pub struct Node {
    pub id: ObjectId,
    /// `node.name`, the stable half of a port's policy name
    pub name: String,
}

/// A PipeWire port on a node
#[derive(Debug, Clone)]
pub struct Port {
    pub id: ObjectId,
    pub node_id: ObjectId,
    /// `port.name`
    pub name: String,
    pub direction: PortDirection,
    /// `node.name:port.name`, compared against the allow-list
    pub full_name: String,
}

impl Port {
    pub fn full_name(node_name: &str, port_name: &str) -> String {
        format!("{}:{}", node_name, port_name)
    }
}

/// A PipeWire link between two ports
#[derive(Debug, Clone)]
pub struct Link {
    pub id: ObjectId,
    pub output_node_id: ObjectId,
    pub output_port_id: ObjectId,
    pub input_node_id: ObjectId,
    pub input_port_id: ObjectId,
}

/// Commands from the control thread to the PipeWire thread
#[derive(Debug, Clone)]
pub enum PwCommand {
    /// Create a link between two ports
    Connect {
        output_port_id: ObjectId,
        input_port_id: ObjectId,
    },
    /// Destroy every link touching a port
    DisconnectAll { port_id: ObjectId },
    /// Quit the main loop
    Shutdown,
}
