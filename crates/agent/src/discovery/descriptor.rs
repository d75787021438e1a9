//! Container descriptor — the immutable per-cycle snapshot handed to
//! renderers.
//!
//! Built fresh from a live inspect call on every update pass and
//! discarded at the end of it. Env and label maps are `BTreeMap`s so a
//! pass iterates them in a stable order.

use std::collections::BTreeMap;

use bollard::models::{ContainerInspectResponse, EndpointSettings, PortBinding};
use serde::Serialize;

use super::NetworkScope;

/// One network the container is attached to, within the request's scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkMembership {
    pub name: String,
    pub id: String,
    pub ip_address: String,
}

/// Port mapping information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: String,
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
}

/// Immutable snapshot of one container, scoped to a configuration
/// request's networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDescriptor {
    pub id: String,
    pub name: String, // Without leading slash
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub networks: Vec<NetworkMembership>,
    pub ports: Vec<PortMapping>,
}

impl ContainerDescriptor {
    /// Map an inspect response into a descriptor, keeping only network
    /// memberships whose id appears in `scope`. Out-of-scope memberships
    /// are dropped here so they never reach a renderer.
    pub fn from_inspect(details: ContainerInspectResponse, scope: &NetworkScope) -> Self {
        let config = details.config.unwrap_or_default();
        let network_settings = details.network_settings.unwrap_or_default();

        let env = parse_env(config.env.as_deref().unwrap_or(&[]));
        let labels: BTreeMap<String, String> =
            config.labels.unwrap_or_default().into_iter().collect();

        // Sort memberships by name before filtering so the descriptor is
        // identical across passes regardless of map iteration order.
        let memberships: BTreeMap<String, EndpointSettings> = network_settings
            .networks
            .unwrap_or_default()
            .into_iter()
            .collect();

        let networks = memberships
            .into_iter()
            .filter_map(|(name, endpoint)| {
                let id = endpoint.network_id?;
                if !scope.contains_key(&id) {
                    tracing::debug!(network = %name, "skipping network outside the request scope");
                    return None;
                }
                Some(NetworkMembership {
                    name,
                    id,
                    ip_address: endpoint.ip_address.unwrap_or_default(),
                })
            })
            .collect();

        let port_table: BTreeMap<String, Option<Vec<PortBinding>>> = network_settings
            .ports
            .unwrap_or_default()
            .into_iter()
            .collect();

        Self {
            id: details.id.unwrap_or_default(),
            name: details
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| "unknown".into()),
            env,
            labels,
            networks,
            ports: parse_ports(port_table),
        }
    }
}

/// Parse `KEY=VALUE` entries; an entry with no `=` yields an empty value.
fn parse_env(entries: &[String]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.clone(), String::new()),
        })
        .collect()
}

/// Decode Docker's port table (`"80/tcp"` → bindings).
///
/// A port with no bindings is still listed as exposed; each host binding
/// gets its own entry.
fn parse_ports(table: BTreeMap<String, Option<Vec<PortBinding>>>) -> Vec<PortMapping> {
    let mut ports = Vec::new();

    for (spec, bindings) in table {
        let (port_str, protocol) = spec.split_once('/').unwrap_or((spec.as_str(), "tcp"));
        let container_port: u16 = match port_str.parse() {
            Ok(port) => port,
            Err(_) => {
                tracing::debug!(spec = %spec, "ignoring unparsable port specification");
                continue;
            }
        };

        let bindings = bindings.unwrap_or_default();
        if bindings.is_empty() {
            ports.push(PortMapping {
                container_port,
                protocol: protocol.to_string(),
                host_ip: None,
                host_port: None,
            });
            continue;
        }

        for binding in bindings {
            ports.push(PortMapping {
                container_port,
                protocol: protocol.to_string(),
                host_ip: binding.host_ip.clone(),
                host_port: binding.host_port.as_deref().and_then(|p| p.parse().ok()),
            });
        }
    }

    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, NetworkSettings};
    use std::collections::HashMap;

    fn endpoint(network_id: &str, ip: &str) -> EndpointSettings {
        EndpointSettings {
            network_id: Some(network_id.to_string()),
            ip_address: Some(ip.to_string()),
            ..Default::default()
        }
    }

    fn inspect_with(
        env: Vec<&str>,
        networks: HashMap<String, EndpointSettings>,
    ) -> ContainerInspectResponse {
        ContainerInspectResponse {
            id: Some("c1".to_string()),
            name: Some("/web1".to_string()),
            config: Some(ContainerConfig {
                env: Some(env.into_iter().map(String::from).collect()),
                ..Default::default()
            }),
            network_settings: Some(NetworkSettings {
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_env_parsing_keeps_value_after_first_equals() {
        let env = parse_env(&["A=1".into(), "B=x=y".into()]);
        assert_eq!(env.get("A").unwrap(), "1");
        assert_eq!(env.get("B").unwrap(), "x=y");
    }

    #[test]
    fn test_env_entry_without_equals_yields_empty_value() {
        let env = parse_env(&["MALFORMED".into()]);
        assert_eq!(env.get("MALFORMED").unwrap(), "");
    }

    #[test]
    fn test_leading_slash_stripped_from_name() {
        let scope = NetworkScope::new();
        let descriptor =
            ContainerDescriptor::from_inspect(inspect_with(vec![], HashMap::new()), &scope);
        assert_eq!(descriptor.name, "web1");
    }

    #[test]
    fn test_out_of_scope_memberships_are_dropped() {
        let mut networks = HashMap::new();
        networks.insert("frontend".to_string(), endpoint("net123", "10.0.0.2"));
        networks.insert("backend".to_string(), endpoint("net999", "10.1.0.2"));

        let mut scope = NetworkScope::new();
        scope.insert("net123".to_string(), "frontend".to_string());

        let descriptor =
            ContainerDescriptor::from_inspect(inspect_with(vec![], networks), &scope);

        assert_eq!(descriptor.networks.len(), 1);
        assert_eq!(descriptor.networks[0].id, "net123");
        assert_eq!(descriptor.networks[0].ip_address, "10.0.0.2");
    }

    #[test]
    fn test_membership_order_is_stable() {
        let mut networks = HashMap::new();
        networks.insert("zeta".to_string(), endpoint("n1", "10.0.0.1"));
        networks.insert("alpha".to_string(), endpoint("n2", "10.0.0.2"));

        let mut scope = NetworkScope::new();
        scope.insert("n1".to_string(), "zeta".to_string());
        scope.insert("n2".to_string(), "alpha".to_string());

        let descriptor =
            ContainerDescriptor::from_inspect(inspect_with(vec![], networks), &scope);

        let names: Vec<&str> = descriptor.networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_port_table_decoding() {
        let mut table = BTreeMap::new();
        table.insert("80/tcp".to_string(), None);
        table.insert(
            "443/tcp".to_string(),
            Some(vec![
                PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some("8443".to_string()),
                },
                PortBinding {
                    host_ip: Some("::".to_string()),
                    host_port: Some("8443".to_string()),
                },
            ]),
        );

        let ports = parse_ports(table);
        assert_eq!(ports.len(), 3);
        assert_eq!(ports[0].container_port, 443);
        assert_eq!(ports[0].host_port, Some(8443));
        assert_eq!(ports[2].container_port, 80);
        assert_eq!(ports[2].host_port, None);
    }

    #[test]
    fn test_unparsable_port_spec_is_ignored() {
        let mut table = BTreeMap::new();
        table.insert("not-a-port/tcp".to_string(), None);
        assert!(parse_ports(table).is_empty());
    }
}
