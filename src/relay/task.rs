//! The per-request relay task and its handle

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::frame::{classify_line, Frame, LineSplitter};
use crate::history::{ChatTurn, HistoryStore};
use crate::llm::ByteStream;

/// Channel capacity used when none is configured
pub const DEFAULT_BUFFER: usize = 64;

/// How long a single send may wait on a full channel
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning for a relay task
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Bounded capacity of the delta channel
    pub buffer: usize,
    /// A consumer that leaves the channel full for this long is treated as gone
    pub send_timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_BUFFER,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Where the finished turn is recorded
#[derive(Clone)]
pub struct TurnSink {
    pub store: Arc<dyn HistoryStore>,
    pub user_id: String,
    pub message: String,
}

impl TurnSink {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        user_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            message: message.into(),
        }
    }
}

/// One item delivered to the client side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A text fragment, in provider order
    Delta(String),
    /// The provider side finished; no more deltas follow
    Done,
}

/// Why the relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `[DONE]` sentinel received
    Sentinel,
    /// The provider body ended without a sentinel
    UpstreamClosed,
    /// Reading the provider body failed
    UpstreamError,
    /// The client went away or stopped reading
    DownstreamClosed,
    /// The cancellation token fired
    Cancelled,
}

impl Termination {
    /// Whether the provider finished the reply
    pub fn is_complete(&self) -> bool {
        matches!(self, Termination::Sentinel | Termination::UpstreamClosed)
    }

    /// Whether the client side is still there to receive a terminal marker
    fn downstream_alive(&self) -> bool {
        matches!(
            self,
            Termination::Sentinel | Termination::UpstreamClosed | Termination::UpstreamError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Sentinel => "sentinel",
            Termination::UpstreamClosed => "upstream_closed",
            Termination::UpstreamError => "upstream_error",
            Termination::DownstreamClosed => "downstream_closed",
            Termination::Cancelled => "cancelled",
        }
    }
}

/// Final report of a relay task
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    /// Concatenation of every delta read, in order
    pub response: String,
    pub termination: Termination,
    /// Number of deltas read from the provider
    pub deltas: usize,
    /// Whether a turn was written to the store
    pub persisted: bool,
}

/// Spawns relay tasks
pub struct StreamRelay;

impl StreamRelay {
    /// Start relaying `body` and return the client-facing handle
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(body: ByteStream, sink: TurnSink, options: RelayOptions) -> RelayHandle {
        let (tx, rx) = mpsc::channel(options.buffer.max(1));
        let cancel = CancellationToken::new();

        let worker = RelayWorker {
            tx,
            cancel: cancel.clone(),
            options,
            response: String::new(),
            deltas: 0,
        };
        let task = tokio::spawn(worker.run(body, sink));

        RelayHandle {
            events: rx,
            cancel,
            task,
        }
    }
}

/// Client-facing side of a running relay
#[derive(Debug)]
pub struct RelayHandle {
    events: mpsc::Receiver<RelayEvent>,
    cancel: CancellationToken,
    task: JoinHandle<RelayOutcome>,
}

impl RelayHandle {
    /// Next event, or `None` once the relay has closed the channel
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.events.recv().await
    }

    /// Ask the relay to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drop the event receiver and wait for the task to finish
    pub async fn join(self) -> Result<RelayOutcome, JoinError> {
        drop(self.events);
        self.task.await
    }

    /// Split into a self-cancelling event stream and the task handle
    ///
    /// Dropping the stream cancels the relay. Dropping the join handle
    /// detaches the task, which still finishes and persists on its own.
    pub fn into_stream(self) -> (RelayStream, JoinHandle<RelayOutcome>) {
        let stream = RelayStream {
            inner: ReceiverStream::new(self.events),
            _guard: self.cancel.drop_guard(),
        };
        (stream, self.task)
    }
}

/// Event stream that cancels its relay when dropped
#[derive(Debug)]
pub struct RelayStream {
    inner: ReceiverStream<RelayEvent>,
    _guard: DropGuard,
}

impl Stream for RelayStream {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

struct RelayWorker {
    tx: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    options: RelayOptions,
    response: String,
    deltas: usize,
}

impl RelayWorker {
    async fn run(mut self, mut body: ByteStream, sink: TurnSink) -> RelayOutcome {
        tracing::debug!(user_id = %sink.user_id, "Relay started");

        let termination = self.pump(&mut body).await;

        // Release the provider connection before anything else
        drop(body);

        if termination.downstream_alive() {
            // Best effort, the client may still leave now
            let _ = self.send(RelayEvent::Done).await;
        }
        let RelayWorker {
            tx,
            response,
            deltas,
            ..
        } = self;
        drop(tx);

        let persisted = if termination.is_complete() || !response.is_empty() {
            persist(&sink, &response).await
        } else {
            false
        };

        tracing::info!(
            user_id = %sink.user_id,
            termination = termination.as_str(),
            deltas,
            response_len = response.len(),
            persisted,
            "Relay finished"
        );

        RelayOutcome {
            response,
            termination,
            deltas,
            persisted,
        }
    }

    async fn pump(&mut self, body: &mut ByteStream) -> Termination {
        let mut splitter = LineSplitter::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.tx.closed() => return Termination::DownstreamClosed,
                _ = self.cancel.cancelled() => return Termination::Cancelled,
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for line in splitter.push(&bytes) {
                        if let Some(termination) = self.dispatch(&line).await {
                            return termination;
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Provider stream failed mid-reply");
                    return Termination::UpstreamError;
                }
                None => {
                    if let Some(line) = splitter.finish() {
                        if let Some(termination) = self.dispatch(&line).await {
                            return termination;
                        }
                    }
                    return Termination::UpstreamClosed;
                }
            }
        }
    }

    /// Handle one line; `Some` means stop
    async fn dispatch(&mut self, line: &str) -> Option<Termination> {
        match classify_line(line) {
            Frame::Skip => None,
            Frame::Done => Some(Termination::Sentinel),
            Frame::Malformed(e) => {
                tracing::warn!(error = %e, "Skipping malformed stream frame");
                None
            }
            Frame::Deltas(deltas) => {
                for delta in deltas {
                    self.response.push_str(&delta);
                    self.deltas += 1;
                    if let Err(termination) = self.send(RelayEvent::Delta(delta)).await {
                        return Some(termination);
                    }
                }
                None
            }
        }
    }

    async fn send(&self, event: RelayEvent) -> Result<(), Termination> {
        tokio::select! {
            biased;
            sent = tokio::time::timeout(self.options.send_timeout, self.tx.send(event)) => match sent {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(Termination::DownstreamClosed),
                Err(_) => {
                    tracing::warn!(
                        timeout = ?self.options.send_timeout,
                        "Client stopped reading, abandoning stream"
                    );
                    Err(Termination::DownstreamClosed)
                }
            },
            _ = self.cancel.cancelled() => Err(Termination::Cancelled),
        }
    }
}

async fn persist(sink: &TurnSink, response: &str) -> bool {
    let turn = ChatTurn::new(sink.user_id.as_str(), sink.message.as_str(), response);
    match sink.store.append(turn).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(user_id = %sink.user_id, error = %e, "Failed to persist streamed turn");
            false
        }
    }
}
