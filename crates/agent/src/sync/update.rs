//! Update pass — one full discovery → render → exchange sweep.

use tracing::info;

use crate::discovery::{self, DiscoveryError};
use crate::state::EngineState;
use crate::sync::exchange::{self, Outcome, RetryPolicy};

/// What one pass did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub requests: usize,
    pub done: usize,
    pub skipped: usize,
}

/// Run one update pass: list requests, then bring each one to a terminal
/// state in listing order. Per-request failures end in `Skipped` and do
/// not abort the pass; only the initial listing can fail it.
pub async fn run_pass(state: &EngineState) -> Result<PassSummary, DiscoveryError> {
    info!("updating configurations");

    let requests = discovery::list_requests(state.docker.as_ref()).await?;
    let policy = RetryPolicy::from_config(&state.config);

    let mut summary = PassSummary {
        requests: requests.len(),
        ..Default::default()
    };

    for request in &requests {
        info!(
            container = %request.name,
            renderer = %request.renderer,
            networks = request.networks.len(),
            "synchronizing configuration"
        );

        match exchange::run(state.docker.as_ref(), &state.renderers, request, &policy).await {
            Outcome::Done { .. } => summary.done += 1,
            Outcome::Skipped { .. } => summary.skipped += 1,
        }
    }

    info!(
        requests = summary.requests,
        done = summary.done,
        skipped = summary.skipped,
        "update pass complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::frame::{encode, StreamKind};
    use crate::client::fake::{FakeDocker, FakeExec};
    use crate::config::AgentConfig;
    use crate::discovery::{RENDERER_LABEL, REQUEST_LABEL, RESPONSE_LABEL};
    use crate::render::RendererRegistry;
    use crate::state::EngineState;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use bollard::models::{
        ContainerConfig, ContainerInspectResponse, ContainerSummary,
        ContainerSummaryNetworkSettings, EndpointResource, EndpointSettings, NetworkInspect,
        NetworkSettings,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    fn proxy_summary() -> ContainerSummary {
        let mut labels = HashMap::new();
        labels.insert(REQUEST_LABEL.to_string(), "cat /tmp/template".to_string());
        labels.insert(RESPONSE_LABEL.to_string(), "apply".to_string());
        labels.insert(RENDERER_LABEL.to_string(), "nginx".to_string());

        let mut networks = HashMap::new();
        networks.insert(
            "N".to_string(),
            EndpointSettings {
                network_id: Some("net123".to_string()),
                ..Default::default()
            },
        );

        ContainerSummary {
            id: Some("proxy-id".to_string()),
            names: Some(vec!["/proxy".to_string()]),
            labels: Some(labels),
            network_settings: Some(ContainerSummaryNetworkSettings {
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn web1_inspect() -> ContainerInspectResponse {
        let mut labels = HashMap::new();
        labels.insert(
            "docker-proxy.default.host".to_string(),
            "app.example.com".to_string(),
        );

        let mut networks = HashMap::new();
        networks.insert(
            "N".to_string(),
            EndpointSettings {
                network_id: Some("net123".to_string()),
                ip_address: Some("10.0.0.2".to_string()),
                ..Default::default()
            },
        );

        ContainerInspectResponse {
            id: Some("web1-id".to_string()),
            name: Some("/web1".to_string()),
            config: Some(ContainerConfig {
                labels: Some(labels),
                ..Default::default()
            }),
            network_settings: Some(NetworkSettings {
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn seeded_state() -> (Arc<FakeDocker>, EngineState) {
        let fake = Arc::new(FakeDocker::new());

        fake.add_container(proxy_summary()).await;
        fake.set_inspect("web1-id", web1_inspect()).await;

        let mut members = HashMap::new();
        members.insert("web1-id".to_string(), EndpointResource::default());
        fake.set_network(
            "net123",
            NetworkInspect {
                containers: Some(members),
                ..Default::default()
            },
        )
        .await;

        let template = BASE64.encode("# managed by confsync\n");
        fake.script_exec(
            "proxy-id",
            FakeExec::Respond(vec![encode(StreamKind::Stdout, template.as_bytes())]),
        )
        .await;
        fake.script_exec("proxy-id", FakeExec::Respond(vec![])).await;

        let config = AgentConfig {
            retry_delay_secs: 0,
            ..AgentConfig::default()
        };
        let state = EngineState::new(fake.clone(), RendererRegistry::default(), config);
        (fake, state)
    }

    #[tokio::test]
    async fn test_pass_renders_and_pushes_for_one_request() {
        let (fake, state) = seeded_state().await;

        let summary = run_pass(&state).await.unwrap();
        assert_eq!(
            summary,
            PassSummary {
                requests: 1,
                done: 1,
                skipped: 0
            }
        );

        let calls = fake.exec_calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].cmd, vec!["cat", "/tmp/template"]);
        assert_eq!(calls[1].cmd[0], "apply");

        let pushed = BASE64.decode(calls[1].cmd[1].as_bytes()).unwrap();
        let pushed = String::from_utf8(pushed).unwrap();
        assert!(pushed.starts_with("# managed by confsync"));
        assert!(pushed.contains("upstream http_web1_80 {"));
        assert!(pushed.contains("server 10.0.0.2:80;"));
        assert!(pushed.contains("server_name app.example.com;"));
    }

    #[tokio::test]
    async fn test_pass_without_requests_is_a_no_op() {
        let fake = Arc::new(FakeDocker::new());
        let state = EngineState::new(
            fake.clone(),
            RendererRegistry::default(),
            AgentConfig::default(),
        );

        let summary = run_pass(&state).await.unwrap();
        assert_eq!(summary, PassSummary::default());
        assert!(fake.exec_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_request_does_not_abort_the_pass() {
        let (fake, state) = seeded_state().await;

        // A second requester with a renderer nobody registered.
        let mut broken = proxy_summary();
        broken.id = Some("broken-id".to_string());
        broken.names = Some(vec!["/broken".to_string()]);
        if let Some(labels) = broken.labels.as_mut() {
            labels.insert(RENDERER_LABEL.to_string(), "haproxy".to_string());
        }
        fake.add_container(broken).await;

        let summary = run_pass(&state).await.unwrap();
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.skipped, 1);
    }
}
