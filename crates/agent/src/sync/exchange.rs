//! Exchange protocol — pull template, render, push result, with bounded
//! retries.
//!
//! Containers are often granted network membership before they finish
//! writing their template, and that startup race is indistinguishable
//! from any other exec failure. The policy is therefore uniform: any
//! retryable failure sleeps a fixed delay and restarts from a fresh
//! topology snapshot, up to a bounded attempt count.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::channel::{self, ChannelError};
use crate::client::docker::DockerOps;
use crate::config::AgentConfig;
use crate::discovery::{self, ConfigRequest, DiscoveryError};
use crate::render::{RenderError, Renderer, RendererRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Terminal result of one request's exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done { attempts: u32 },
    Skipped { attempts: u32 },
}

/// Exchange state. `Requesting` re-resolves topology, pulls the
/// template, renders and pushes; the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Requesting { attempt: u32 },
    Done { attempts: u32 },
    Skipped { attempts: u32 },
}

/// Transition taken when attempt `attempt` fails with a retryable error.
fn next_after_failure(attempt: u32, max_attempts: u32) -> ExchangeState {
    if attempt >= max_attempts {
        ExchangeState::Skipped { attempts: attempt }
    } else {
        ExchangeState::Requesting {
            attempt: attempt + 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ExchangeError {
    /// Render failures will never succeed on retry; everything else is
    /// assumed transient.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExchangeError::Render(_))
    }
}

/// Run one request to a terminal state. Never returns an error: every
/// failure ends in `Skipped` and is logged here.
pub async fn run(
    docker: &dyn DockerOps,
    renderers: &RendererRegistry,
    request: &ConfigRequest,
    policy: &RetryPolicy,
) -> Outcome {
    // Resolved once per request; an unknown name is fatal, not retryable.
    let renderer = match renderers.get(&request.renderer) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!(container = %request.name, "{e}; skipping request");
            return Outcome::Skipped { attempts: 0 };
        }
    };

    let mut state = ExchangeState::Requesting { attempt: 1 };
    loop {
        match state {
            ExchangeState::Requesting { attempt } => {
                match attempt_once(docker, renderer.as_ref(), request).await {
                    Ok(()) => state = ExchangeState::Done { attempts: attempt },
                    Err(e) if e.is_fatal() => {
                        error!(container = %request.name, "{e}; skipping request");
                        state = ExchangeState::Skipped { attempts: attempt };
                    }
                    Err(e) => {
                        warn!(
                            container = %request.name,
                            attempt,
                            max_attempts = policy.max_attempts,
                            "exchange attempt failed: {e}"
                        );
                        state = next_after_failure(attempt, policy.max_attempts);
                        if matches!(state, ExchangeState::Requesting { .. }) {
                            tokio::time::sleep(policy.delay).await;
                        }
                    }
                }
            }
            ExchangeState::Done { attempts } => {
                info!(container = %request.name, attempts, "configuration synchronized");
                return Outcome::Done { attempts };
            }
            ExchangeState::Skipped { attempts } => {
                warn!(container = %request.name, attempts, "request skipped");
                return Outcome::Skipped { attempts };
            }
        }
    }
}

/// One full attempt: fresh topology snapshot, pull, render, push.
async fn attempt_once(
    docker: &dyn DockerOps,
    renderer: &dyn Renderer,
    request: &ConfigRequest,
) -> Result<(), ExchangeError> {
    let members = discovery::resolve_members(docker, &request.networks).await?;

    let mut containers = Vec::with_capacity(members.len());
    for member_id in &members {
        containers.push(discovery::describe(docker, member_id, &request.networks).await?);
    }

    let template = channel::capture_text(docker, &request.id, &request.request).await?;
    let rendered = renderer.render(&template, &containers)?;
    channel::send_text(docker, &request.id, &request.response, &rendered).await?;

    Ok(())
}
