//! Reverse-proxy render model — virtual hosts, upstreams, servers,
//! locations.
//!
//! `build` is a pure function from container descriptors to the data a
//! proxy renderer consumes. Metadata outside the recognized prefixes is
//! dropped before any of it can reach generated output.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::discovery::descriptor::ContainerDescriptor;

/// Label project prefix for proxy metadata: `docker-proxy.<group>.<field>`.
pub const PROXY_PROJECT: &str = "docker-proxy";
/// Env vars outside this prefix never reach a renderer.
pub const ENV_PREFIX: &str = "VIRTUAL";

pub const HOST_VAR: &str = "VIRTUAL_HOST";
pub const PORT_VAR: &str = "VIRTUAL_PORT";
pub const PATH_VAR: &str = "VIRTUAL_PATH";
pub const PROTO_VAR: &str = "VIRTUAL_PROTO";

/// The label group whose fields back every other group.
pub const DEFAULT_GROUP: &str = "default";

const DEFAULT_PORT: u16 = 80;
const DEFAULT_PATH: &str = "/";
const DEFAULT_PROTOCOL: &str = "http";

/// One publicly addressable (host, port, path, protocol) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualHost {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub path_is_regex: bool,
    pub protocol: String,
}

/// One reachable backend address for an upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamAddr {
    pub network: String,
    pub ip_address: String,
    pub port: u16,
}

/// A named group of equivalent backend addresses; one per distinct
/// (protocol, container, port) triple, so requests can fail over
/// between networks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upstream {
    pub name: String,
    pub networks: Vec<UpstreamAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: String,
    pub path_is_regex: bool,
    pub protocol: String,
    pub upstream: String,
}

/// One server per distinct hostname; duplicate paths are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub host: String,
    pub locations: Vec<Location>,
}

/// Everything a proxy renderer needs, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderData {
    pub servers: Vec<Server>,
    pub upstreams: Vec<Upstream>,
    /// Base64 JSON tags pairing (protocol, host, path, container), for
    /// operator-facing diagnostics in generated error responses.
    pub routes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Host,
    Port,
    Path,
    Protocol,
}

impl Field {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "host" => Some(Field::Host),
            "port" => Some(Field::Port),
            "path" => Some(Field::Path),
            "protocol" => Some(Field::Protocol),
            _ => None,
        }
    }
}

/// Parse a `docker-proxy.<group>.<field>` label key into its structured
/// parts. Keys with the wrong arity, a foreign project, or an unknown
/// field are rejected here, once, at the boundary.
fn parse_proxy_key(key: &str) -> Option<(&str, Field)> {
    let parts: Vec<&str> = key.split('.').collect();
    let [project, group, field] = parts[..] else {
        return None;
    };
    if project != PROXY_PROJECT {
        return None;
    }
    Some((group, Field::parse(field)?))
}

/// Build the render model from one cycle's container snapshots.
pub fn build(containers: &[ContainerDescriptor]) -> RenderData {
    let mut data = RenderData::default();

    for container in containers.iter().filter(|c| is_eligible(c)) {
        let container = narrow(container);
        let mut emitted: HashSet<(String, String)> = HashSet::new();

        for vhost in virtual_hosts(&container) {
            let upstream = format!("{}_{}_{}", vhost.protocol, container.name, vhost.port);

            if !data.upstreams.iter().any(|u| u.name == upstream) {
                data.upstreams.push(Upstream {
                    name: upstream.clone(),
                    networks: container
                        .networks
                        .iter()
                        .map(|membership| UpstreamAddr {
                            network: membership.name.clone(),
                            ip_address: membership.ip_address.clone(),
                            port: vhost.port,
                        })
                        .collect(),
                });
            }

            let index = match data.servers.iter().position(|s| s.host == vhost.host) {
                Some(index) => index,
                None => {
                    data.servers.push(Server {
                        host: vhost.host.clone(),
                        locations: Vec::new(),
                    });
                    data.servers.len() - 1
                }
            };
            let server = &mut data.servers[index];

            if emitted.insert((vhost.host.clone(), vhost.path.clone()))
                && !server.locations.iter().any(|l| l.path == vhost.path)
            {
                server.locations.push(Location {
                    path: vhost.path.clone(),
                    path_is_regex: vhost.path_is_regex,
                    protocol: vhost.protocol.clone(),
                    upstream: upstream.clone(),
                });
            }

            data.routes.push(route_tag(&vhost, &container.name));
        }
    }

    data
}

/// A container is a candidate backend only if it declares a host: the
/// `VIRTUAL_HOST` variable, or at least one non-empty `host` label field.
fn is_eligible(container: &ContainerDescriptor) -> bool {
    if container.env.contains_key(HOST_VAR) {
        return true;
    }

    container.labels.iter().any(|(key, value)| {
        matches!(parse_proxy_key(key), Some((_, Field::Host))) && !value.is_empty()
    })
}

/// Drop every env/label entry outside the recognized prefixes.
fn narrow(container: &ContainerDescriptor) -> ContainerDescriptor {
    let mut narrowed = container.clone();
    narrowed.env.retain(|key, _| key.starts_with(ENV_PREFIX));
    narrowed
        .labels
        .retain(|key, _| key.starts_with(PROXY_PROJECT));
    narrowed
}

/// Zero-or-one virtual host from env vars plus one per distinct label
/// group, in stable label order.
fn virtual_hosts(container: &ContainerDescriptor) -> Vec<VirtualHost> {
    let mut vhosts = Vec::new();

    if let Some(host) = container.env.get(HOST_VAR) {
        vhosts.push(make_vhost(
            host.clone(),
            container.env.get(PORT_VAR),
            container.env.get(PATH_VAR).map(String::as_str),
            container.env.get(PROTO_VAR),
        ));
    }

    vhosts.extend(vhosts_from_labels(container));
    vhosts
}

fn vhosts_from_labels(container: &ContainerDescriptor) -> Vec<VirtualHost> {
    // Collect fields per group, keeping the order groups first appear in.
    let mut groups: Vec<(String, Vec<(Field, String)>)> = Vec::new();

    for (key, value) in &container.labels {
        let Some((group, field)) = parse_proxy_key(key) else {
            continue;
        };
        match groups.iter_mut().find(|(name, _)| name.as_str() == group) {
            Some((_, fields)) => fields.push((field, value.clone())),
            None => groups.push((group.to_string(), vec![(field, value.clone())])),
        }
    }

    let defaults: Vec<(Field, String)> = groups
        .iter()
        .find(|(name, _)| name.as_str() == DEFAULT_GROUP)
        .map(|(_, fields)| fields.clone())
        .unwrap_or_default();

    groups
        .iter()
        .map(|(name, fields)| {
            // A group's own field wins; `default` backs the rest.
            let get = |field: Field| -> Option<&String> {
                fields
                    .iter()
                    .find(|(f, _)| *f == field)
                    .map(|(_, v)| v)
                    .or_else(|| {
                        if name.as_str() == DEFAULT_GROUP {
                            return None;
                        }
                        defaults.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
                    })
            };

            make_vhost(
                get(Field::Host).cloned().unwrap_or_default(),
                get(Field::Port),
                get(Field::Path).map(String::as_str),
                get(Field::Protocol),
            )
        })
        .collect()
}

fn make_vhost(
    host: String,
    port: Option<&String>,
    path: Option<&str>,
    protocol: Option<&String>,
) -> VirtualHost {
    let path = path.unwrap_or(DEFAULT_PATH).trim_start_matches('~').to_string();

    VirtualHost {
        host,
        // An unparsable port counts as absent.
        port: port.and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT),
        path_is_regex: path.starts_with('^'),
        path,
        protocol: protocol.cloned().unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
    }
}

fn route_tag(vhost: &VirtualHost, container: &str) -> String {
    let tag = serde_json::json!({
        "protocol": vhost.protocol,
        "host": vhost.host,
        "path": vhost.path,
        "container": container,
    });
    BASE64.encode(tag.to_string())
}
