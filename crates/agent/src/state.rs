use std::sync::Arc;

use crate::client::docker::DockerOps;
use crate::config::AgentConfig;
use crate::render::RendererRegistry;

/// Process-wide handles threaded through every update pass.
///
/// Deliberately free of mutable state: container and network snapshots
/// are cycle-local and passed as arguments, never cached here.
pub struct EngineState {
    pub docker: Arc<dyn DockerOps>,
    pub renderers: RendererRegistry,
    pub config: AgentConfig,
}

impl EngineState {
    pub fn new(
        docker: Arc<dyn DockerOps>,
        renderers: RendererRegistry,
        config: AgentConfig,
    ) -> Self {
        Self {
            docker,
            renderers,
            config,
        }
    }
}

pub type SharedState = Arc<EngineState>;
