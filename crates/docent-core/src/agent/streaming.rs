//! Consumer side of a streaming turn.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};

use super::{AgentError, TurnEvent, TurnOutcome};

/// One item yielded by a [`TurnStream`].
#[derive(Debug, Clone)]
pub enum StreamUpdate {
    /// New answer text since the previous delta.
    Delta(String),
    /// A tool call the agent is about to execute.
    ToolCall {
        name: String,
        args: serde_json::Value,
    },
    /// Terminal item: the turn finished with this outcome.
    Done(TurnOutcome),
}

/// Incremental view of a running turn.
///
/// Answer snapshots arriving within the debounce window are merged, so a
/// fast model produces fewer, larger deltas. Deltas are for display: text
/// streamed before a tool round stays in them, so the canonical answer is the
/// one carried by [`StreamUpdate::Done`]. Dropping the stream aborts the turn.
pub struct TurnStream {
    rx: mpsc::Receiver<TurnEvent>,
    handle: JoinHandle<()>,
    debounce: Duration,
    emitted_len: usize,
    latest: String,
    pending: Option<TurnEvent>,
    finished: bool,
}

impl TurnStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<TurnEvent>,
        handle: JoinHandle<()>,
        debounce: Duration,
    ) -> Self {
        Self {
            rx,
            handle,
            debounce,
            emitted_len: 0,
            latest: String::new(),
            pending: None,
            finished: false,
        }
    }

    /// Next update, or `None` once the turn has completed or failed.
    pub async fn next(&mut self) -> Option<Result<StreamUpdate, AgentError>> {
        if self.finished {
            return None;
        }

        loop {
            let event = match self.pending.take() {
                Some(event) => event,
                None => {
                    if let Some(event) = self.rx.recv().await {
                        event
                    } else {
                        // Producer went away without a terminal event.
                        self.finished = true;
                        return Some(Err(AgentError::Cancelled));
                    }
                }
            };

            match event {
                TurnEvent::Snapshot(text) => {
                    self.latest = text;
                    self.coalesce().await;
                    if let Some(delta) = self.take_delta() {
                        return Some(Ok(StreamUpdate::Delta(delta)));
                    }
                }
                TurnEvent::ToolCall { name, args } => {
                    return Some(Ok(StreamUpdate::ToolCall { name, args }));
                }
                TurnEvent::Completed(outcome) => {
                    if let Some(delta) = self.take_delta() {
                        self.pending = Some(TurnEvent::Completed(outcome));
                        return Some(Ok(StreamUpdate::Delta(delta)));
                    }
                    self.finished = true;
                    return Some(Ok(StreamUpdate::Done(outcome)));
                }
                TurnEvent::Failed(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Drain the stream, returning the final outcome.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the turn.
    pub async fn collect(mut self) -> Result<TurnOutcome, AgentError> {
        while let Some(update) = self.next().await {
            if let StreamUpdate::Done(outcome) = update? {
                return Ok(outcome);
            }
        }
        Err(AgentError::Cancelled)
    }

    /// Absorb snapshots until the debounce window closes or another kind of
    /// event arrives.
    async fn coalesce(&mut self) {
        let deadline = Instant::now() + self.debounce;
        loop {
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(TurnEvent::Snapshot(text))) => self.latest = text,
                Ok(Some(other)) => {
                    self.pending = Some(other);
                    return;
                }
                Ok(None) | Err(_) => return,
            }
        }
    }

    fn take_delta(&mut self) -> Option<String> {
        let delta = self.latest.get(self.emitted_len..)?;
        if delta.is_empty() {
            return None;
        }
        let delta = delta.to_owned();
        self.emitted_len = self.latest.len();
        Some(delta)
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
