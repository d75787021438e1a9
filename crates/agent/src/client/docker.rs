//! Docker trait — abstract interface for the runtime capabilities the
//! engine consumes.
//!
//! Exactly five capabilities: list containers, inspect a container,
//! inspect a network, capture exec output, stream engine events.
//! `live.rs` provides the real Bollard-backed implementation.
//! `fake.rs` provides a test double.

use std::pin::Pin;

use crate::docker::client::DockerError;
pub use crate::docker::exec::ExecStream;

/// Unified async interface over the container runtime.
///
/// Object-safe thanks to `Pin<Box<…>>` returns for async methods.
/// Implementations must be `Send + Sync` so they can live inside an
/// `Arc<EngineState>`.
pub trait DockerOps: Send + Sync {
    fn list_containers(
        &self,
    ) -> Pin<
        Box<
            dyn std::future::Future<
                    Output = Result<Vec<bollard::models::ContainerSummary>, DockerError>,
                > + Send
                + '_,
        >,
    >;

    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<
        Box<
            dyn std::future::Future<
                    Output = Result<bollard::models::ContainerInspectResponse, DockerError>,
                > + Send
                + 'a,
        >,
    >;

    fn inspect_network<'a>(
        &'a self,
        network_id: &'a str,
    ) -> Pin<
        Box<
            dyn std::future::Future<
                    Output = Result<bollard::models::NetworkInspect, DockerError>,
                > + Send
                + 'a,
        >,
    >;

    fn exec_capture<'a>(
        &'a self,
        container_id: &'a str,
        cmd: Vec<String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecStream, DockerError>> + Send + 'a>>;

    fn stream_events(
        &self,
    ) -> Pin<
        Box<
            dyn futures_util::Stream<Item = Result<bollard::models::EventMessage, DockerError>>
                + Send
                + '_,
        >,
    >;
}
