//! Boot — logging init, config load, Docker connection, state creation.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AgentConfig;
use crate::docker::client::DockerClient;
use crate::render::RendererRegistry;
use crate::state::{EngineState, SharedState};

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load config, connect to Docker, and build shared state.
pub async fn boot() -> Result<SharedState, Box<dyn std::error::Error>> {
    info!("Starting Confsync Agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::load()?;
    config.validate()?;
    info!(
        "Loaded configuration: retry_max_attempts={}, retry_delay_secs={}",
        config.retry_max_attempts, config.retry_delay_secs
    );

    info!(
        "Connecting to Docker daemon at: {}",
        if config.docker_socket.is_empty() {
            "default socket"
        } else {
            &config.docker_socket
        }
    );

    let docker = DockerClient::new(&config.docker_socket).map_err(|e| {
        error!("Failed to connect to Docker: {}", e);
        e
    })?;

    info!("Successfully connected to Docker daemon");

    let state = Arc::new(EngineState::new(
        Arc::new(docker),
        RendererRegistry::default(),
        config,
    ));

    Ok(state)
}
