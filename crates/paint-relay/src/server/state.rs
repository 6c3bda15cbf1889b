//! Relay state
//!
//! Application state shared by the HTTP handlers.

use crate::registry::Registry;
use paint_common::{AppConfig, RelayConfig};
use std::sync::Arc;

/// Relay application state
#[derive(Clone)]
pub struct RelayState {
    /// Handle to the running registry
    registry: Registry,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl RelayState {
    pub fn new(registry: Registry, config: AppConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Relay tuning applied to every accepted connection
    pub fn relay_config(&self) -> &RelayConfig {
        &self.config.relay
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("registry", &self.registry)
            .field("config", &"AppConfig")
            .finish()
    }
}
