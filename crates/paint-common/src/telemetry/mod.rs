//! Telemetry
//!
//! Installs the process-wide `tracing` subscriber; pretty output in development,
//! JSON in production.

mod tracing_setup;

pub use tracing_setup::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
