//! Chat session: client-side history plus the log write after each turn.

use std::path::PathBuf;

use docent_llm::provider::LlmProvider;

use crate::agent::{AgentError, StreamUpdate};
use crate::context::AppContext;
use crate::logs::{LogSource, LogWriteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the displayed conversation. Never sent back to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug)]
pub struct TurnReply {
    /// Canonical answer, the final cumulative stream value.
    pub answer: String,
    /// Where the log record landed; a write failure does not lose the answer.
    pub logged: Result<PathBuf, LogWriteError>,
}

pub struct ChatSession<'a, P> {
    ctx: &'a AppContext<P>,
    history: Vec<ChatEntry>,
    source: LogSource,
}

impl<'a, P: LlmProvider + 'static> ChatSession<'a, P> {
    #[must_use]
    pub fn new(ctx: &'a AppContext<P>) -> Self {
        Self {
            ctx,
            history: Vec::new(),
            source: LogSource::User,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: LogSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    /// Run one turn, forwarding stream updates to `on_update`.
    ///
    /// The user message is recorded first and stays in history even if the
    /// turn fails. A completed turn writes exactly one log record.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the model or a tool call fails. No log
    /// record is written in that case.
    pub async fn ask<F>(&mut self, prompt: &str, mut on_update: F) -> Result<TurnReply, AgentError>
    where
        F: FnMut(&StreamUpdate),
    {
        self.history.push(ChatEntry {
            role: ChatRole::User,
            content: prompt.to_owned(),
        });

        let agent = self.ctx.agent();
        let streaming = self.ctx.config().streaming.enabled && agent.provider().supports_streaming();

        let outcome = if streaming {
            let mut stream = agent.run_stream(prompt, self.ctx.config().debounce());
            loop {
                match stream.next().await {
                    Some(Ok(StreamUpdate::Done(outcome))) => break outcome,
                    Some(Ok(update)) => on_update(&update),
                    Some(Err(e)) => return Err(e),
                    None => return Err(AgentError::Cancelled),
                }
            }
        } else {
            let outcome = agent.run(prompt).await?;
            on_update(&StreamUpdate::Delta(outcome.answer.clone()));
            outcome
        };

        let record = agent.log_record(outcome.messages, self.source);
        let logged = self.ctx.log_store().append(&record);
        match &logged {
            Ok(path) => tracing::debug!(path = %path.display(), "interaction logged"),
            Err(e) => tracing::warn!("failed to write interaction log: {e}"),
        }

        self.history.push(ChatEntry {
            role: ChatRole::Assistant,
            content: outcome.answer.clone(),
        });

        Ok(TurnReply {
            answer: outcome.answer,
            logged,
        })
    }
}
