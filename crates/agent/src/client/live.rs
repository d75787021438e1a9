//! Live — implements `DockerOps` for the real Bollard-backed `DockerClient`.

use std::pin::Pin;

use crate::client::docker::{DockerOps, ExecStream};
use crate::docker::client::{DockerClient, DockerError};

impl DockerOps for DockerClient {
    fn list_containers(
        &self,
    ) -> Pin<
        Box<
            dyn std::future::Future<
                    Output = Result<Vec<bollard::models::ContainerSummary>, DockerError>,
                > + Send
                + '_,
        >,
    > {
        Box::pin(self.list_containers())
    }

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
    > {
        Box::pin(self.inspect_container(id))
    }

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
    > {
        Box::pin(self.inspect_network(network_id))
    }

    fn exec_capture<'a>(
        &'a self,
        container_id: &'a str,
        cmd: Vec<String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecStream, DockerError>> + Send + 'a>>
    {
        Box::pin(self.exec_capture(container_id, cmd))
    }

    fn stream_events(
        &self,
    ) -> Pin<
        Box<
            dyn futures_util::Stream<Item = Result<bollard::models::EventMessage, DockerError>>
                + Send
                + '_,
        >,
    > {
        Box::pin(DockerClient::stream_events(self))
    }
}
