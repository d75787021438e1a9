//! Watch — first update pass, then re-run on network topology events.

use std::time::Duration;

use bollard::models::{EventMessage, EventMessageTypeEnum};
use futures_util::stream::StreamExt;
use tracing::{error, info, warn};

use crate::discovery::DEFAULT_NETWORK;
use crate::state::SharedState;
use crate::sync::update;

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Run the engine: one startup pass, then the event loop.
///
/// The startup pass must succeed — before it runs no configuration
/// exists to serve, so a failure exits the process with an error.
/// Afterwards every failure is logged and the loop keeps going.
pub async fn run(state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    update::run_pass(&state).await?;
    watch_events(state).await
}

async fn watch_events(state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    info!("watching for network topology changes");

    loop {
        let mut events = state.docker.stream_events();

        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    let Some((action, network)) = topology_change(&event) else {
                        continue;
                    };
                    info!(network = %network, action = %action, "network topology changed");
                    if let Err(e) = update::run_pass(&state).await {
                        error!("update pass failed: {e}");
                    }
                }
                Err(e) => {
                    warn!("event stream error: {e}");
                    break;
                }
            }
        }

        // The daemon may be restarting; resubscribe after a short delay.
        warn!(
            "event stream ended; resubscribing in {}s",
            RESUBSCRIBE_DELAY.as_secs()
        );
        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}

/// Returns `(action, network name)` when the event is a connect or
/// disconnect on a non-default network. Events on the default network
/// never affect a request's scope and are ignored entirely.
fn topology_change(event: &EventMessage) -> Option<(&str, &str)> {
    if event.typ != Some(EventMessageTypeEnum::NETWORK) {
        return None;
    }

    let action = event.action.as_deref()?;
    if action != "connect" && action != "disconnect" {
        return None;
    }

    let network = event.actor.as_ref()?.attributes.as_ref()?.get("name")?;
    if network == DEFAULT_NETWORK {
        return None;
    }

    Some((action, network))
}
