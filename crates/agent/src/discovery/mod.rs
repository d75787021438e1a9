//! Topology discovery — which containers request configuration, and who
//! is reachable on their networks.
//!
//! All lookups go through the [`DockerOps`] capability trait; failures
//! propagate to the exchange protocol, whose retry loop is the recovery
//! mechanism for containers and networks vanishing mid-pass.

pub mod descriptor;

use std::collections::{BTreeSet, HashMap};

use bollard::models::ContainerSummary;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::docker::DockerOps;
use crate::docker::client::DockerError;
use descriptor::ContainerDescriptor;

/// Label carrying the command that emits a container's template.
pub const REQUEST_LABEL: &str = "confsync.request";
/// Label carrying the command that receives the rendered result.
pub const RESPONSE_LABEL: &str = "confsync.response";
/// Label naming the renderer to apply between the two.
pub const RENDERER_LABEL: &str = "confsync.renderer";

/// The default network, excluded from every scope.
pub const DEFAULT_NETWORK: &str = "bridge";

/// Map of network id → network name. Used purely as a filter set.
pub type NetworkScope = HashMap<String, String>;

/// One container's request for configuration synchronization.
#[derive(Debug, Clone)]
pub struct ConfigRequest {
    pub id: String,
    pub name: String,
    /// Command that produces the template (argv).
    pub request: Vec<String>,
    /// Command that consumes the rendered result (argv).
    pub response: Vec<String>,
    /// Renderer selector, resolved against the registry per request.
    pub renderer: String,
    /// Networks this request may see members of.
    pub networks: NetworkScope,
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("runtime lookup failed: {0}")]
    Docker(#[from] DockerError),
}

/// List all containers and keep those carrying the complete discovery
/// label triple. Containers with missing or partial metadata are skipped
/// silently — that is the common case, not an error.
pub async fn list_requests(docker: &dyn DockerOps) -> Result<Vec<ConfigRequest>, DiscoveryError> {
    let containers = docker.list_containers().await?;

    let mut requests = Vec::new();
    for summary in &containers {
        if let Some(request) = request_from_summary(summary) {
            debug!(
                container = %request.name,
                renderer = %request.renderer,
                networks = request.networks.len(),
                "found configuration request"
            );
            requests.push(request);
        }
    }

    info!("found {} configuration request(s)", requests.len());
    Ok(requests)
}

/// Union the member container ids of every in-scope network.
///
/// The result is a sorted set: deduplicated by construction even when a
/// container sits on several in-scope networks, and iterated in a stable
/// order by the caller.
pub async fn resolve_members(
    docker: &dyn DockerOps,
    scope: &NetworkScope,
) -> Result<BTreeSet<String>, DiscoveryError> {
    let mut members = BTreeSet::new();

    for network_id in scope.keys() {
        let details = docker.inspect_network(network_id).await?;
        if let Some(containers) = details.containers {
            members.extend(containers.into_keys());
        }
    }

    Ok(members)
}

/// Inspect one container and snapshot it, scoped to `scope`.
pub async fn describe(
    docker: &dyn DockerOps,
    id: &str,
    scope: &NetworkScope,
) -> Result<ContainerDescriptor, DiscoveryError> {
    let details = docker.inspect_container(id).await?;
    Ok(ContainerDescriptor::from_inspect(details, scope))
}

fn request_from_summary(summary: &ContainerSummary) -> Option<ConfigRequest> {
    let id = summary.id.clone()?;
    let labels = summary.labels.as_ref()?;

    let request = parse_command(labels.get(REQUEST_LABEL)?)?;
    let response = parse_command(labels.get(RESPONSE_LABEL)?)?;
    let renderer = labels.get(RENDERER_LABEL)?.trim();
    if renderer.is_empty() {
        return None;
    }

    let name = summary
        .names
        .as_deref()
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/'))
        .unwrap_or("unknown")
        .to_string();

    Some(ConfigRequest {
        id,
        name,
        request,
        response,
        renderer: renderer.to_string(),
        networks: scope_from_summary(summary),
    })
}

/// Split a command label into argv. Surrounding double quotes (compose
/// files often keep them) are trimmed before quote-aware splitting. An
/// empty or unparsable value disqualifies the container.
fn parse_command(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim().trim_matches('"');
    let argv = match shell_words::split(trimmed) {
        Ok(argv) => argv,
        Err(e) => {
            debug!("ignoring unparsable command label {raw:?}: {e}");
            return None;
        }
    };
    if argv.is_empty() {
        return None;
    }
    Some(argv)
}

/// A container's own memberships, minus the default network.
fn scope_from_summary(summary: &ContainerSummary) -> NetworkScope {
    let mut scope = NetworkScope::new();

    let networks = summary
        .network_settings
        .as_ref()
        .and_then(|settings| settings.networks.as_ref());

    if let Some(networks) = networks {
        for (name, endpoint) in networks {
            if name == DEFAULT_NETWORK {
                continue;
            }
            if let Some(network_id) = endpoint.network_id.clone() {
                scope.insert(network_id, name.clone());
            }
        }
    }

    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeDocker;
    use bollard::models::{
        ContainerSummaryNetworkSettings, EndpointResource, EndpointSettings, NetworkInspect,
    };
    use std::collections::HashMap;

    fn summary(
        id: &str,
        labels: &[(&str, &str)],
        networks: &[(&str, &str)],
    ) -> ContainerSummary {
        let endpoints: HashMap<String, EndpointSettings> = networks
            .iter()
            .map(|(name, network_id)| {
                (
                    name.to_string(),
                    EndpointSettings {
                        network_id: Some(network_id.to_string()),
                        ..Default::default()
                    },
                )
            })
            .collect();

        ContainerSummary {
            id: Some(id.to_string()),
            names: Some(vec![format!("/{id}")]),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            network_settings: Some(ContainerSummaryNetworkSettings {
                networks: Some(endpoints),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn full_triple() -> Vec<(&'static str, &'static str)> {
        vec![
            (REQUEST_LABEL, "cat /etc/confsync/template"),
            (RESPONSE_LABEL, "confsync-apply"),
            (RENDERER_LABEL, "nginx"),
        ]
    }

    #[tokio::test]
    async fn test_list_requests_requires_all_three_labels() {
        let fake = FakeDocker::new();
        fake.add_container(summary("complete", &full_triple(), &[("frontend", "net1")]))
            .await;
        fake.add_container(summary(
            "no-renderer",
            &[(REQUEST_LABEL, "cat t"), (RESPONSE_LABEL, "apply")],
            &[("frontend", "net1")],
        ))
        .await;
        fake.add_container(summary("unlabeled", &[], &[("frontend", "net1")]))
            .await;

        let requests = list_requests(&fake).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "complete");
        assert_eq!(requests[0].renderer, "nginx");
        assert_eq!(requests[0].request, vec!["cat", "/etc/confsync/template"]);
    }

    #[tokio::test]
    async fn test_empty_label_value_excludes_container() {
        let fake = FakeDocker::new();
        fake.add_container(summary(
            "empty-request",
            &[
                (REQUEST_LABEL, ""),
                (RESPONSE_LABEL, "apply"),
                (RENDERER_LABEL, "nginx"),
            ],
            &[],
        ))
        .await;

        assert!(list_requests(&fake).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scope_excludes_bridge_network() {
        let fake = FakeDocker::new();
        fake.add_container(summary(
            "web",
            &full_triple(),
            &[("bridge", "bridge-id"), ("frontend", "net1")],
        ))
        .await;

        let requests = list_requests(&fake).await.unwrap();
        assert_eq!(requests[0].networks.len(), 1);
        assert_eq!(requests[0].networks.get("net1").unwrap(), "frontend");
    }

    #[tokio::test]
    async fn test_quoted_command_label_is_trimmed() {
        let fake = FakeDocker::new();
        let labels = vec![
            (REQUEST_LABEL, "\"cat /tmp/template\""),
            (RESPONSE_LABEL, "apply"),
            (RENDERER_LABEL, "nginx"),
        ];
        fake.add_container(summary("web", &labels, &[])).await;

        let requests = list_requests(&fake).await.unwrap();
        assert_eq!(requests[0].request, vec!["cat", "/tmp/template"]);
    }

    #[tokio::test]
    async fn test_resolve_members_dedups_across_networks() {
        let fake = FakeDocker::new();

        let mut net1 = HashMap::new();
        net1.insert("shared".to_string(), EndpointResource::default());
        net1.insert("only-net1".to_string(), EndpointResource::default());
        fake.set_network(
            "net1",
            NetworkInspect {
                containers: Some(net1),
                ..Default::default()
            },
        )
        .await;

        let mut net2 = HashMap::new();
        net2.insert("shared".to_string(), EndpointResource::default());
        fake.set_network(
            "net2",
            NetworkInspect {
                containers: Some(net2),
                ..Default::default()
            },
        )
        .await;

        let mut scope = NetworkScope::new();
        scope.insert("net1".to_string(), "frontend".to_string());
        scope.insert("net2".to_string(), "backend".to_string());

        let members = resolve_members(&fake, &scope).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.contains("shared"));
        assert!(members.contains("only-net1"));
    }

    #[tokio::test]
    async fn test_resolve_members_propagates_vanished_network() {
        let fake = FakeDocker::new();
        let mut scope = NetworkScope::new();
        scope.insert("gone".to_string(), "frontend".to_string());

        let result = resolve_members(&fake, &scope).await;
        assert!(matches!(
            result,
            Err(DiscoveryError::Docker(DockerError::NetworkNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_describe_propagates_vanished_container() {
        let fake = FakeDocker::new();
        let scope = NetworkScope::new();
        let result = describe(&fake, "gone", &scope).await;
        assert!(matches!(
            result,
            Err(DiscoveryError::Docker(DockerError::ContainerNotFound(_)))
        ));
    }
}
