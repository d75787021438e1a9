//! Exec channel — exchange plain strings with a container over the
//! runtime's remote-execution primitive.
//!
//! `capture_text` pulls the output of a command (demultiplexed, then
//! base64-decoded); `send_text` pushes a string as a base64 trailing
//! argument. Everything above this module deals only in plain strings.

pub mod frame;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::stream::StreamExt;
use thiserror::Error;

use crate::client::docker::DockerOps;
use crate::docker::client::DockerError;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("exec failed: {0}")]
    Exec(#[from] DockerError),
    #[error(transparent)]
    Frame(#[from] frame::FrameError),
    #[error("captured output is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
    #[error("decoded payload is not valid UTF-8: {0}")]
    Text(#[from] std::string::FromUtf8Error),
}

/// Run `command` inside the container and return its decoded stdout.
///
/// Stdout payloads are concatenated in arrival order and interpreted as
/// base64; ASCII whitespace is skipped first since commands usually end
/// their output with a newline.
pub async fn capture_text(
    docker: &dyn DockerOps,
    container_id: &str,
    command: &[String],
) -> Result<String, ChannelError> {
    let mut stream = docker.exec_capture(container_id, command.to_vec()).await?;

    let mut collector = frame::StdoutCollector::new();
    while let Some(chunk) = stream.next().await {
        collector.push(&chunk?)?;
    }

    let encoded: Vec<u8> = collector
        .finish()?
        .into_iter()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let decoded = BASE64.decode(encoded)?;
    Ok(String::from_utf8(decoded)?)
}

/// Run `command` with `text` base64-encoded as one trailing argument,
/// discarding whatever the command prints.
pub async fn send_text(
    docker: &dyn DockerOps,
    container_id: &str,
    command: &[String],
    text: &str,
) -> Result<(), ChannelError> {
    let mut argv = command.to_vec();
    argv.push(BASE64.encode(text));

    let mut stream = docker.exec_capture(container_id, argv).await?;
    while let Some(chunk) = stream.next().await {
        chunk?;
    }

    Ok(())
}
