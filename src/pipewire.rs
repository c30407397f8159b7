//! PipeWire binding of the audio graph seam.

mod client;
mod manager;
mod state;
mod types;

pub use client::PipeWireClient;
