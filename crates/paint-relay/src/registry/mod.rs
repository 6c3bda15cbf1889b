//! Connection registry
//!
//! Tracks live connections and fans broadcasts out to them.

mod command;
mod registry;

pub use registry::{Registry, RegistryLoop};
