use std::sync::Arc;

use crate::error::Result;

/// Opaque handle of a port in the audio graph.
///
/// Validity is owned by the service; a stale id simply fails to resolve.
pub type PortId = u32;

/// One connection state change reported by the audio graph service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Output side of the link
    pub source: PortId,
    /// Input side of the link
    pub dest: PortId,
    /// True for a new link, false for a removed one
    pub connected: bool,
}

impl ConnectionEvent {
    pub fn new(source: PortId, dest: PortId, connected: bool) -> Self {
        Self {
            source,
            dest,
            connected,
        }
    }
}

/// Receives connection notifications from the audio graph service.
///
/// Called on the service's own thread, possibly with realtime priority.
/// Implementations must return in bounded time, must not allocate and must
/// not call back into the service.
pub trait ConnectionHandler: Send + Sync {
    fn on_connection(&self, event: ConnectionEvent);
}

/// Port name resolution that is safe to use from the notification context.
pub trait PortNames: Send + Sync {
    /// Run `f` with the policy name of `id`, or return `None` if the port
    /// does not exist (any more).
    fn with_port_name<R>(&self, id: PortId, f: impl FnOnce(&str) -> R) -> Option<R>;
}

/// Commands issued from the control thread.
pub trait AudioGraph {
    fn lookup_port_by_name(&self, name: &str) -> Option<PortId>;

    fn port_exists(&self, id: PortId) -> bool;

    /// Remove every link that has `port` on either end.
    fn disconnect_all(&self, port: PortId) -> Result<()>;

    /// Link `output` to `input` by name. Linking an already linked pair is a
    /// no-op.
    fn connect(&self, output: &str, input: &str) -> Result<()>;
}

/// Lifecycle of a client session with the audio graph service.
///
/// Opening is backend specific; closing happens on drop.
pub trait GraphClient: AudioGraph {
    type Names: PortNames + 'static;

    /// Name resolver that can be moved into a [`ConnectionHandler`].
    fn port_names(&self) -> Arc<Self::Names>;

    /// Install the handler that receives connection notifications once the
    /// client is active. Replaces any previous handler.
    fn register_connection_handler(&mut self, handler: Arc<dyn ConnectionHandler>) -> Result<()>;

    fn activate(&mut self) -> Result<()>;

    fn deactivate(&mut self) -> Result<()>;
}
