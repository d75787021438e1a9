//! Reference renderer — nginx-style reverse-proxy configuration.
//!
//! Builds the render model and expands the pulled template: the markers
//! `{{upstreams}}`, `{{servers}}` and `{{routes}}` are replaced with
//! generated blocks, and any block whose marker is absent is appended,
//! so an empty template still yields a complete configuration. The
//! result then goes through a brace-indent normalization pass.

use super::model::{self, RenderData};
use super::{RenderError, Renderer};
use crate::discovery::descriptor::ContainerDescriptor;

pub const UPSTREAMS_MARKER: &str = "{{upstreams}}";
pub const SERVERS_MARKER: &str = "{{servers}}";
pub const ROUTES_MARKER: &str = "{{routes}}";

pub struct NginxRenderer;

impl Renderer for NginxRenderer {
    fn name(&self) -> &'static str {
        "nginx"
    }

    fn render(
        &self,
        template: &str,
        containers: &[ContainerDescriptor],
    ) -> Result<String, RenderError> {
        let data = model::build(containers);

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                data = %serde_json::to_string(&data).unwrap_or_default(),
                "assembled render data"
            );
        }

        Ok(reformat(&expand(template, &data)))
    }
}

fn expand(template: &str, data: &RenderData) -> String {
    let blocks = [
        (UPSTREAMS_MARKER, upstream_blocks(data)),
        (SERVERS_MARKER, server_blocks(data)),
        (ROUTES_MARKER, route_block(data)),
    ];

    let mut output = template.to_string();
    let mut appendix = String::new();

    for (marker, block) in blocks {
        if output.contains(marker) {
            output = output.replace(marker, &block);
        } else {
            appendix.push('\n');
            appendix.push_str(&block);
        }
    }

    output + &appendix
}

fn upstream_blocks(data: &RenderData) -> String {
    let mut text = String::new();

    for upstream in &data.upstreams {
        text.push_str(&format!("upstream {} {{\n", upstream.name));
        if upstream.networks.is_empty() {
            // No address on any shared network; keep the config loadable.
            text.push_str("server 127.0.0.1 down;\n");
        }
        for addr in &upstream.networks {
            text.push_str(&format!("# {}\n", addr.network));
            text.push_str(&format!("server {}:{};\n", addr.ip_address, addr.port));
        }
        text.push_str("}\n");
    }

    text
}

fn server_blocks(data: &RenderData) -> String {
    let mut text = String::new();

    for server in &data.servers {
        text.push_str("server {\n");
        text.push_str(&format!("server_name {};\n", server.host));
        for location in &server.locations {
            let prefix = if location.path_is_regex { "~ " } else { "" };
            text.push_str(&format!("location {}{} {{\n", prefix, location.path));
            text.push_str(&format!(
                "proxy_pass {}://{};\n",
                location.protocol, location.upstream
            ));
            text.push_str("}\n");
        }
        text.push_str("}\n");
    }

    text
}

fn route_block(data: &RenderData) -> String {
    let mut text = String::new();
    for route in &data.routes {
        text.push_str(&format!("# route {}\n", route));
    }
    text
}

/// Normalize whitespace: trim every line, indent by brace depth, keep a
/// blank line before a block opener (unless a comment introduces it) and
/// after a top-level closing brace.
fn reformat(text: &str) -> String {
    const INDENT: &str = "    ";

    let mut depth: i32 = 0;
    let mut doc: Vec<String> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();

        if line.ends_with('{') {
            if let Some(previous) = doc.last() {
                if !previous.is_empty() && !previous.trim_start().starts_with('#') {
                    doc.push(String::new());
                }
            }
        }

        if line.starts_with('}') {
            depth -= 1;
        }

        if !line.is_empty() {
            depth = depth.max(0);
            doc.push(format!("{}{}", INDENT.repeat(depth as usize), line));
        }

        if line.ends_with('{') {
            depth += 1;
        }

        if line == "}" && depth == 0 {
            doc.push(String::new());
        }
    }

    while doc.last().is_some_and(|line| line.is_empty()) {
        doc.pop();
    }

    doc.join("\n") + "\n"
}
