//! Exec domain — run a command inside a container and capture its
//! multiplexed output stream.

use super::client::{DockerClient, DockerError};
use crate::channel::frame::{self, StreamKind};

use bollard::container::LogOutput;
use bollard::exec::{StartExecOptions, StartExecResults};
use bollard::models::ExecConfig;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use std::pin::Pin;

/// Raw multiplexed exec output, exactly as the daemon's HTTP API frames it.
pub type ExecStream =
    Pin<Box<dyn futures_util::Stream<Item = Result<Bytes, DockerError>> + Send>>;

impl DockerClient {
    /// Start `cmd` inside a container with stdout/stderr capture and
    /// return the raw multiplexed byte stream.
    pub async fn exec_capture(
        &self,
        container_id: &str,
        cmd: Vec<String>,
    ) -> Result<ExecStream, DockerError> {
        let config = ExecConfig {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            cmd: Some(cmd),
            ..Default::default()
        };

        let created = self
            .client
            .create_exec(container_id, config)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => DockerError::ContainerNotFound(container_id.to_string()),
                other => DockerError::BollardError(other),
            })?;

        let options = Some(StartExecOptions {
            detach: false,
            tty: false,
            ..Default::default()
        });

        match self.client.start_exec(&created.id, options).await? {
            StartExecResults::Attached { output, .. } => {
                // Bollard demultiplexes the wire stream for us; put the
                // frames back so every `DockerOps` implementation hands the
                // channel layer the same byte stream the daemon produces.
                let stream = output.map(|item| {
                    item.map(reframe).map_err(DockerError::from)
                });
                Ok(Box::pin(stream))
            }
            StartExecResults::Detached => Err(DockerError::StreamClosed),
        }
    }
}

fn reframe(output: LogOutput) -> Bytes {
    match output {
        LogOutput::StdOut { message } | LogOutput::Console { message } => {
            frame::encode(StreamKind::Stdout, &message)
        }
        LogOutput::StdErr { message } => frame::encode(StreamKind::Stderr, &message),
        LogOutput::StdIn { message } => frame::encode(StreamKind::Stdin, &message),
    }
}
