//! Fan-out orchestration
//!
//! One independent pipeline per role: retrieve, compose, generate, stream.
//! Role pipelines share no mutable state and a failure in one never affects
//! the others. The orchestrator does not retry; retry is a caller policy
//! applied to an individual failed stream.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{StreamFailure, SummarizeError};
use crate::prompt;
use crate::provider::{GeminiProvider, GenerationProvider};
use crate::retrieval::ContextRetriever;
use crate::types::{Role, SummaryEvent, SummaryResult};

/// Channel capacity per stream; fragments are small and drained promptly.
const STREAM_BUFFER: usize = 32;

/// The summary pipeline entry point.
pub struct Summarizer {
    retriever: Arc<ContextRetriever>,
    provider: Arc<dyn GenerationProvider>,
}

impl Summarizer {
    /// Wire the pipeline from configuration: Gemini generation, and
    /// retrieval when the embedding credential and vector store are both
    /// configured.
    pub fn new(config: &Config) -> Self {
        Self {
            retriever: Arc::new(ContextRetriever::from_config(config)),
            provider: Arc::new(GeminiProvider::from_config(config)),
        }
    }

    /// Build a summarizer from explicit parts. The seam used by tests and
    /// by callers bringing their own provider.
    pub fn with_parts(retriever: ContextRetriever, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            retriever: Arc::new(retriever),
            provider,
        }
    }

    /// Start one summary stream per role, all running concurrently.
    ///
    /// Fails with `InvalidRequest` before any pipeline work when the text
    /// is blank. Each returned stream terminates independently.
    pub fn summarize_all(
        &self,
        text: &str,
    ) -> Result<HashMap<Role, SummaryStream>, SummarizeError> {
        let text = validated(text)?;
        info!(len = text.len(), "starting summary fan-out");
        Ok(Role::ALL
            .into_iter()
            .map(|role| (role, self.spawn_role(role, text)))
            .collect())
    }

    /// Start a single role's summary stream.
    pub fn summarize_role(&self, text: &str, role: Role) -> Result<SummaryStream, SummarizeError> {
        let text = validated(text)?;
        Ok(self.spawn_role(role, text))
    }

    /// Non-streaming variant: run one role's pipeline to completion and
    /// return the accumulated text, for callers that cannot consume
    /// incremental streams.
    pub async fn summarize_one(&self, text: &str, role: Role) -> Result<String, SummarizeError> {
        let stream = self.summarize_role(text, role)?;
        stream.drain().await.map_err(SummarizeError::from)
    }

    /// Spawn the task that owns one role's stream. The task routes every
    /// outcome, including its own errors, into the stream's terminal event;
    /// nothing is detached without an error sink.
    fn spawn_role(&self, role: Role, text: &str) -> SummaryStream {
        let (event_tx, event_rx) = mpsc::channel(STREAM_BUFFER);
        let retriever = Arc::clone(&self.retriever);
        let provider = Arc::clone(&self.provider);
        let text = text.to_string();
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(async move {
            let passages = retriever.retrieve(&text).await;
            let bundle = prompt::compose(role, &text, &passages);
            debug!(
                role = %role,
                passages = passages.len(),
                model = provider.model_id(),
                "starting generation"
            );

            // The provider writes raw fragments; forward them as events so
            // the terminal is guaranteed to be sent last, by this task,
            // exactly once.
            let (fragment_tx, mut fragment_rx) = mpsc::channel::<String>(STREAM_BUFFER);
            let forward_tx = event_tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(fragment) = fragment_rx.recv().await {
                    if forward_tx
                        .send(SummaryEvent::Fragment { text: fragment })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });

            let outcome = provider
                .stream_generate(&bundle, fragment_tx, cancel_token)
                .await;
            // The provider has returned and dropped its sender; wait for the
            // forwarder so all fragments precede the terminal event.
            let _ = forwarder.await;

            let terminal = match outcome {
                Ok(()) => {
                    debug!(role = %role, "generation completed");
                    SummaryEvent::Completed
                }
                Err(e) => {
                    warn!(role = %role, error = %e, "generation failed");
                    SummaryEvent::Failed { failure: e.into() }
                }
            };
            let _ = event_tx.send(terminal).await;
        });

        SummaryStream {
            role,
            rx: event_rx,
            handle,
        }
    }
}

fn validated(text: &str) -> Result<&str, SummarizeError> {
    if text.trim().is_empty() {
        return Err(SummarizeError::InvalidRequest("text is required"));
    }
    Ok(text)
}

/// One role's summary stream: zero or more fragments followed by exactly
/// one terminal event. Fragments arrive in production order.
pub struct SummaryStream {
    role: Role,
    rx: mpsc::Receiver<SummaryEvent>,
    handle: JoinHandle<()>,
}

impl SummaryStream {
    pub fn role(&self) -> Role {
        self.role
    }

    /// Receive the next event. Returns `None` once the terminal event has
    /// been consumed and the channel is closed.
    pub async fn next_event(&mut self) -> Option<SummaryEvent> {
        self.rx.recv().await
    }

    /// Drain the stream to its terminal state, concatenating fragments in
    /// arrival order.
    pub async fn drain(self) -> Result<String, StreamFailure> {
        let SummaryStream {
            role,
            mut rx,
            handle,
        } = self;
        let mut accumulated = String::new();
        let mut outcome = None;

        while let Some(event) = rx.recv().await {
            match event {
                SummaryEvent::Fragment { text } => accumulated.push_str(&text),
                SummaryEvent::Completed => {
                    outcome = Some(Ok(()));
                    break;
                }
                SummaryEvent::Failed { failure } => {
                    outcome = Some(Err(failure));
                    break;
                }
            }
        }
        let _ = handle.await;

        match outcome {
            Some(Ok(())) => {
                debug!(role = %role, len = accumulated.len(), "stream drained");
                Ok(accumulated)
            }
            Some(Err(failure)) => Err(failure),
            // The producing task ended without a terminal event (panic or
            // abort); surface that instead of presenting a truncated
            // summary as success.
            None => Err(StreamFailure::GenerationFailed(
                "stream closed before a terminal event".to_string(),
            )),
        }
    }

    /// Expose the stream as a `Stream` of events for adapter-based
    /// consumers. The producing task keeps running; its outcome still
    /// arrives through the channel as the terminal event.
    pub fn into_stream(self) -> SummaryEventStream {
        SummaryEventStream {
            rx: self.rx,
            _handle: self.handle,
            terminal_seen: false,
        }
    }
}

/// `Stream` adapter over a [`SummaryStream`].
///
/// Upholds the exactly-one-terminal contract the same way `drain` does: if
/// the producing task dies without sending a terminal event, a failure
/// terminal is synthesized instead of the stream silently ending.
pub struct SummaryEventStream {
    rx: mpsc::Receiver<SummaryEvent>,
    _handle: JoinHandle<()>,
    terminal_seen: bool,
}

impl Stream for SummaryEventStream {
    type Item = SummaryEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<SummaryEvent>> {
        let this = self.get_mut();
        if this.terminal_seen {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if matches!(
                    event,
                    SummaryEvent::Completed | SummaryEvent::Failed { .. }
                ) {
                    this.terminal_seen = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.terminal_seen = true;
                Poll::Ready(Some(SummaryEvent::Failed {
                    failure: StreamFailure::GenerationFailed(
                        "stream closed before a terminal event".to_string(),
                    ),
                }))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Drain all role streams concurrently into an aggregate result. Partial
/// success is preserved per role.
pub async fn collect_all(streams: HashMap<Role, SummaryStream>) -> SummaryResult {
    let drains = streams
        .into_iter()
        .map(|(role, stream)| async move { (role, stream.drain().await) });
    let by_role = futures::future::join_all(drains).await.into_iter().collect();
    SummaryResult { by_role }
}
