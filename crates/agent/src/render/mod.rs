//! Render module — pluggable renderers behind a name-keyed registry.
//!
//! A renderer is a pure function from (template, container snapshots) to
//! generated text. Lookup failure is a distinct, fatal error: an unknown
//! renderer name will never succeed, unlike a transient exec failure.

pub mod model;
pub mod nginx;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::discovery::descriptor::ContainerDescriptor;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unknown renderer: {0}")]
    UnknownRenderer(String),
    #[error("renderer '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
}

pub trait Renderer: Send + Sync {
    /// Registry key this renderer is selected by.
    fn name(&self) -> &'static str;

    /// Render `template` against one cycle's container snapshots.
    fn render(
        &self,
        template: &str,
        containers: &[ContainerDescriptor],
    ) -> Result<String, RenderError>;
}

/// Name → renderer lookup table, resolved once per configuration request.
pub struct RendererRegistry {
    renderers: HashMap<&'static str, Arc<dyn Renderer>>,
}

impl RendererRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// The built-in renderer set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(nginx::NginxRenderer));
        registry
    }

    pub fn register(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(renderer.name(), renderer);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Renderer>, RenderError> {
        self.renderers
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::UnknownRenderer(name.to_string()))
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
