//! Network domain — inspect.

use super::client::{DockerClient, DockerError};

impl DockerClient {
    /// Inspect a specific network.
    pub async fn inspect_network(
        &self,
        network_id: &str,
    ) -> Result<bollard::models::NetworkInspect, DockerError> {
        self.client
            .inspect_network(
                network_id,
                None::<bollard::query_parameters::InspectNetworkOptions>,
            )
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => DockerError::NetworkNotFound(network_id.to_string()),
                other => DockerError::BollardError(other),
            })
    }
}
