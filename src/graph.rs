//! Seam between the enforcement core and the audio graph service.
//!
//! The service owns port enumeration, connect/disconnect primitives and
//! notification delivery. The core only talks to it through these traits.

#[cfg(test)]
pub mod memory;
mod types;

pub use types::*;
