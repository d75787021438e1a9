//! Container domain — list running containers, inspect one.

use super::client::{DockerClient, DockerError};

use bollard::models::{ContainerInspectResponse, ContainerSummary};
use bollard::query_parameters::ListContainersOptions;

impl DockerClient {
    /// List running containers (the daemon's default listing scope).
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>, DockerError> {
        let options = Some(ListContainersOptions::default());
        self.client
            .list_containers(options)
            .await
            .map_err(DockerError::from)
    }

    /// Returns the full `ContainerInspectResponse` from Docker for a container.
    pub async fn inspect_container(
        &self,
        id: &str,
    ) -> Result<ContainerInspectResponse, DockerError> {
        self.client
            .inspect_container(id, None)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => DockerError::ContainerNotFound(id.to_string()),
                other => DockerError::BollardError(other),
            })
    }
}
