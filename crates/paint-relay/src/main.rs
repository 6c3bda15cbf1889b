//! Paint relay entry point
//!
//! Run with:
//! ```bash
//! cargo run -p paint-relay
//! ```
//!
//! Configuration is loaded from environment variables.

use paint_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, code = e.error_code(), "Relay failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Configuration first: the log format depends on the environment
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        address = %config.server.address(),
        static_dir = %config.server.static_dir,
        echo_to_sender = config.relay.echo_to_sender,
        "Configuration loaded"
    );

    paint_relay::run(config).await
}
