//! Chat relay server
//!
//! Room-partitioned chat over QUIC: clients authenticate against a durable
//! credential store, join named rooms, and exchange broadcast messages and
//! typing-activity signals scoped to their current room.
//!
//! Configuration comes from the environment:
//!   PORT            listen port (default 3500)
//!   PALAVER_STORE   credential store path (default data/logins.json)
//!   PALAVER_ASSETS  static asset path (default public)
//!   PALAVER_ENV     set to "production" to disable the dev origin list
//!
//! Usage:
//!   cargo run                         # run with defaults
//!   PORT=4000 cargo run               # run on a specific port
//!   RUST_LOG=debug cargo run          # verbose logging

use palaver::{RelayConfig, RelayServer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env()?;

    info!("Starting chat relay...");
    info!("Configuration:");
    info!("  - Bind address: {}", config.bind_addr);
    info!("  - Max connections: {}", config.max_connections);
    info!("  - Credential store: {}", config.store_path.display());
    info!("  - Static assets: {}", config.asset_dir.display());
    info!(
        "  - Allowed origins: {}",
        if config.allowed_origins.is_empty() {
            "none (production)".to_string()
        } else {
            config.allowed_origins.join(", ")
        }
    );

    let mut server = RelayServer::new(config)?;

    // Start server (this will run indefinitely)
    if let Err(e) = server.start().await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
