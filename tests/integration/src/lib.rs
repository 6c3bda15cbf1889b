//! Integration test utilities for the paint relay
//!
//! Spawns real relay servers on loopback and drives them with WebSocket and
//! HTTP clients.

pub mod helpers;

pub use helpers::*;
