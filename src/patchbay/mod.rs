//! Patchbay module
//!
//! Enforces the connection policy on the monitored ports.
//! Independent of PipeWire; works purely through the `graph` traits.

pub mod handler;
pub mod manager;
pub mod reconcile;
pub mod reconnect;
pub mod rules;

pub use handler::OverflowPolicy;
pub use manager::Enforcer;
