//! Fake — test double for the runtime capabilities.
//!
//! Provides a deterministic [`FakeDocker`] that implements [`DockerOps`]
//! using in-memory state. Containers, networks, events and exec outcomes
//! are seeded up front; every exec invocation is recorded so tests can
//! assert which commands ran.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;

use bytes::Bytes;
use futures_util::StreamExt as _;
use tokio::sync::Mutex;

use crate::client::docker::{DockerOps, ExecStream};
use crate::docker::client::DockerError;

/// A scripted outcome for one `exec_capture` invocation.
#[derive(Clone, Debug)]
pub enum FakeExec {
    /// The exec starts and yields these raw stream chunks.
    Respond(Vec<Bytes>),
    /// The exec primitive itself rejects the call.
    Fail,
}

/// One recorded `exec_capture` invocation.
#[derive(Clone, Debug)]
pub struct ExecCall {
    pub container_id: String,
    pub cmd: Vec<String>,
}

/// Mutable inner state protected by a mutex.
#[derive(Default)]
struct Inner {
    containers: Vec<bollard::models::ContainerSummary>,
    inspects: HashMap<String, bollard::models::ContainerInspectResponse>,
    networks: HashMap<String, bollard::models::NetworkInspect>,
    exec_scripts: HashMap<String, VecDeque<FakeExec>>,
    exec_calls: Vec<ExecCall>,
    events: Vec<bollard::models::EventMessage>,
}

/// A fake runtime client for deterministic testing.
pub struct FakeDocker {
    inner: Mutex<Inner>,
}

impl FakeDocker {
    /// Create an empty fake runtime.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seed a container listing entry.
    pub async fn add_container(&self, summary: bollard::models::ContainerSummary) {
        self.inner.lock().await.containers.push(summary);
    }

    /// Seed the inspect response for a container id.
    pub async fn set_inspect(
        &self,
        id: &str,
        details: bollard::models::ContainerInspectResponse,
    ) {
        self.inner.lock().await.inspects.insert(id.to_string(), details);
    }

    /// Seed the inspect response for a network id.
    pub async fn set_network(&self, id: &str, details: bollard::models::NetworkInspect) {
        self.inner.lock().await.networks.insert(id.to_string(), details);
    }

    /// Queue the outcome of the next exec on `container_id`.
    pub async fn script_exec(&self, container_id: &str, outcome: FakeExec) {
        self.inner
            .lock()
            .await
            .exec_scripts
            .entry(container_id.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Seed an engine event.
    pub async fn push_event(&self, event: bollard::models::EventMessage) {
        self.inner.lock().await.events.push(event);
    }

    /// Every exec invocation recorded so far, in call order.
    pub async fn exec_calls(&self) -> Vec<ExecCall> {
        self.inner.lock().await.exec_calls.clone()
    }
}

impl Default for FakeDocker {
    fn default() -> Self {
        Self::new()
    }
}

// ── DockerOps implementation ────────────────────────────────────

impl DockerOps for FakeDocker {
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
        Box::pin(async {
            let state = self.inner.lock().await;
            Ok(state.containers.clone())
        })
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
        Box::pin(async move {
            let state = self.inner.lock().await;
            state
                .inspects
                .get(id)
                .cloned()
                .ok_or_else(|| DockerError::ContainerNotFound(id.to_string()))
        })
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
        Box::pin(async move {
            let state = self.inner.lock().await;
            state
                .networks
                .get(network_id)
                .cloned()
                .ok_or_else(|| DockerError::NetworkNotFound(network_id.to_string()))
        })
    }

    fn exec_capture<'a>(
        &'a self,
        container_id: &'a str,
        cmd: Vec<String>,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecStream, DockerError>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.exec_calls.push(ExecCall {
                container_id: container_id.to_string(),
                cmd,
            });

            let outcome = state
                .exec_scripts
                .get_mut(container_id)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(FakeExec::Respond(Vec::new()));

            match outcome {
                FakeExec::Respond(chunks) => {
                    let items: Vec<Result<Bytes, DockerError>> =
                        chunks.into_iter().map(Ok).collect();
                    Ok(Box::pin(tokio_stream::iter(items)) as ExecStream)
                }
                FakeExec::Fail => Err(DockerError::StreamClosed),
            }
        })
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
        Box::pin(futures_util::stream::once(async {
            let state = self.inner.lock().await;
            let items: Vec<Result<bollard::models::EventMessage, DockerError>> =
                state.events.clone().into_iter().map(Ok).collect();
            tokio_stream::iter(items)
        })
        .flatten())
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn summary(id: &str) -> bollard::models::ContainerSummary {
        bollard::models::ContainerSummary {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_containers() {
        let fake = FakeDocker::new();
        fake.add_container(summary("abc123")).await;
        fake.add_container(summary("def456")).await;

        let containers = fake.list_containers().await.unwrap();
        assert_eq!(containers.len(), 2);
    }

    #[tokio::test]
    async fn test_inspect_container_not_found() {
        let fake = FakeDocker::new();
        let result = fake.inspect_container("missing").await;
        assert!(matches!(result, Err(DockerError::ContainerNotFound(_))));
    }

    #[tokio::test]
    async fn test_inspect_network_not_found() {
        let fake = FakeDocker::new();
        let result = fake.inspect_network("missing").await;
        assert!(matches!(result, Err(DockerError::NetworkNotFound(_))));
    }

    #[tokio::test]
    async fn test_exec_scripts_pop_in_order() {
        let fake = FakeDocker::new();
        fake.script_exec("web", FakeExec::Fail).await;
        fake.script_exec("web", FakeExec::Respond(vec![Bytes::from_static(b"x")]))
            .await;

        assert!(fake.exec_capture("web", vec!["a".into()]).await.is_err());

        let mut stream = fake.exec_capture("web", vec!["b".into()]).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"x"));

        let calls = fake.exec_calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].cmd, vec!["a".to_string()]);
        assert_eq!(calls[1].cmd, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_unscripted_exec_yields_empty_stream() {
        let fake = FakeDocker::new();
        let mut stream = fake.exec_capture("web", vec!["x".into()]).await.unwrap();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_event_stream_replays_seeded_events() {
        let fake = FakeDocker::new();
        fake.push_event(bollard::models::EventMessage::default()).await;
        fake.push_event(bollard::models::EventMessage::default()).await;

        let mut stream = fake.stream_events();
        let mut count = 0;
        while let Some(event) = stream.next().await {
            event.unwrap();
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
