//! One conversational turn against a tool-calling model.
//!
//! A turn moves `AwaitingModel -> (ToolRequested -> ToolExecuting ->
//! AwaitingModel)* -> Streaming -> Completed`. Each model round either
//! requests tools, which are executed one after another and fed back, or
//! commits to a final answer. A round is final only when it ends without tool
//! calls, whether or not it streamed.
//!
//! Text streamed by a round that then requests tools stays on screen: later
//! snapshots extend it, so cumulative text never shrinks. The answer of the
//! turn is the text of the final round alone.

pub mod error;
pub mod streaming;
mod tool_execution;

use std::sync::Arc;
use std::time::Duration;

use docent_llm::provider::{
    ChatResponse, LlmProvider, Message, MessagePart, Role, StreamEvent, ToolDefinition,
    ToolUseRequest,
};
use docent_tools::{ToolExecutor, ToolRegistry};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::Instrument;

pub use error::AgentError;
pub use streaming::{StreamUpdate, TurnStream};

use crate::logs::{LogRecord, LogSource};
use crate::transcript::{ModelMessage, Part, now_timestamp};

const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
const TURN_CHANNEL_CAPACITY: usize = 64;
const ROUND_SEPARATOR: &str = "\n\n";

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final answer text, the text of the last model round.
    pub answer: String,
    /// Everything exchanged during the turn, starting with the user prompt.
    pub messages: Vec<ModelMessage>,
}

/// Producer-side events sent over the turn channel.
#[derive(Debug)]
pub(crate) enum TurnEvent {
    ToolCall {
        name: String,
        args: serde_json::Value,
    },
    /// Cumulative answer text so far; never shrinks.
    Snapshot(String),
    Completed(TurnOutcome),
    Failed(AgentError),
}

/// What one model round produced.
struct Round {
    text: String,
    calls: Vec<ToolUseRequest>,
}

impl Round {
    fn is_final(&self) -> bool {
        self.calls.is_empty()
    }
}

pub struct Agent<P, T> {
    provider: Arc<P>,
    tools: Arc<T>,
    name: String,
    instructions: String,
    max_tool_iterations: usize,
    tool_defs: Vec<ToolDefinition>,
    tool_names: Vec<String>,
}

impl<P, T> Clone for Agent<P, T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            tools: Arc::clone(&self.tools),
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            max_tool_iterations: self.max_tool_iterations,
            tool_defs: self.tool_defs.clone(),
            tool_names: self.tool_names.clone(),
        }
    }
}

impl<P: LlmProvider, T: ToolExecutor> Agent<P, T> {
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        tools: Arc<T>,
        name: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        let registry = ToolRegistry::from_definitions(tools.tool_definitions());
        let tool_names = registry.names();
        let tool_defs = registry
            .tools()
            .iter()
            .map(tool_execution::tool_def_to_definition)
            .collect();
        Self {
            provider,
            tools,
            name: name.into(),
            instructions: instructions.into(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            tool_defs,
            tool_names,
        }
    }

    #[must_use]
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    #[must_use]
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Snapshot a finished turn for the log store.
    #[must_use]
    pub fn log_record(&self, messages: Vec<ModelMessage>, source: LogSource) -> LogRecord {
        LogRecord {
            agent_name: self.name.clone(),
            system_prompt: self.instructions.clone(),
            provider: self.provider.name().to_owned(),
            model: self.provider.model().to_owned(),
            tools: self.tool_names.clone(),
            messages,
            source,
        }
    }

    /// Run a turn to completion without streaming.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model or a tool call fails, or no final
    /// answer arrives within the tool iteration limit.
    pub async fn run(&self, prompt: &str) -> Result<TurnOutcome, AgentError> {
        self.execute_turn(prompt, None).await
    }

    pub(crate) async fn execute_turn(
        &self,
        prompt: &str,
        sink: Option<&mpsc::Sender<TurnEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let mut messages = vec![
            Message::from_legacy(Role::System, self.instructions.as_str()),
            Message::from_legacy(Role::User, prompt),
        ];
        let mut transcript = vec![ModelMessage::request(vec![Part::UserPrompt {
            content: prompt.to_owned(),
            timestamp: Some(now_timestamp()),
        }])];

        // Text already shown to a streaming consumer by earlier rounds.
        let mut streamed = String::new();

        for iteration in 0..self.max_tool_iterations {
            let round = match sink {
                Some(tx) => self.stream_round(&messages, tx, &mut streamed).await?,
                None => self.blocking_round(&messages).await?,
            };
            tracing::debug!(
                iteration,
                text_len = round.text.len(),
                tool_calls = round.calls.len(),
                is_final = round.is_final(),
                "model round finished"
            );

            let mut parts = Vec::new();
            if !round.text.is_empty() || round.calls.is_empty() {
                parts.push(Part::Text {
                    content: round.text.clone(),
                    id: None,
                });
            }
            parts.extend(round.calls.iter().map(|c| Part::ToolCall {
                tool_name: c.name.clone(),
                args: c.input.clone(),
                tool_call_id: Some(c.id.clone()),
            }));
            transcript.push(ModelMessage::response(parts, self.provider.model()));

            if round.is_final() {
                return Ok(TurnOutcome {
                    answer: round.text,
                    messages: transcript,
                });
            }

            let mut assistant_parts = Vec::new();
            if !round.text.is_empty() {
                assistant_parts.push(MessagePart::Text {
                    text: round.text.clone(),
                });
            }
            assistant_parts.extend(round.calls.iter().map(|c| MessagePart::ToolUse {
                id: c.id.clone(),
                name: c.name.clone(),
                input: c.input.clone(),
            }));
            messages.push(Message::from_parts(Role::Assistant, assistant_parts));

            let (returns, results) = self.execute_tool_calls(&round.calls, sink).await?;
            transcript.push(ModelMessage::request(returns));
            messages.push(Message::from_parts(Role::User, results));
        }

        tracing::warn!(
            max = self.max_tool_iterations,
            "tool loop exhausted without final answer"
        );
        Err(AgentError::ToolLoopExceeded(self.max_tool_iterations))
    }

    async fn blocking_round(&self, messages: &[Message]) -> Result<Round, AgentError> {
        let response = self
            .provider
            .chat_with_tools(messages, &self.tool_defs)
            .instrument(tracing::info_span!("llm_call", streaming = false))
            .await?;
        Ok(match response {
            ChatResponse::Text(text) => Round {
                text,
                calls: Vec::new(),
            },
            ChatResponse::ToolUse { text, tool_calls } => Round {
                text: text.unwrap_or_default(),
                calls: tool_calls,
            },
        })
    }

    /// Stream one round, sending every text delta as a cumulative snapshot
    /// that extends `streamed`.
    async fn stream_round(
        &self,
        messages: &[Message],
        tx: &mpsc::Sender<TurnEvent>,
        streamed: &mut String,
    ) -> Result<Round, AgentError> {
        let mut stream = self
            .provider
            .chat_stream_with_tools(messages, &self.tool_defs)
            .instrument(tracing::info_span!("llm_call", streaming = true))
            .await?;

        let mut round = Round {
            text: String::new(),
            calls: Vec::new(),
        };
        let base = streamed.clone();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    round.text.push_str(&delta);
                    *streamed = if base.is_empty() {
                        round.text.clone()
                    } else {
                        format!("{base}{ROUND_SEPARATOR}{}", round.text)
                    };
                    tx.send(TurnEvent::Snapshot(streamed.clone()))
                        .await
                        .map_err(|_| AgentError::Cancelled)?;
                }
                StreamEvent::ToolCall(call) => round.calls.push(call),
            }
        }

        Ok(round)
    }
}

impl<P, T> Agent<P, T>
where
    P: LlmProvider + 'static,
    T: ToolExecutor + 'static,
{
    /// Start a streaming turn on a background task.
    ///
    /// The returned [`TurnStream`] yields answer deltas coalesced over
    /// `debounce`. Dropping it abandons the turn.
    #[must_use]
    pub fn run_stream(&self, prompt: impl Into<String>, debounce: Duration) -> TurnStream {
        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let agent = self.clone();
        let prompt = prompt.into();
        let handle = tokio::spawn(async move {
            match agent.execute_turn(&prompt, Some(&tx)).await {
                Ok(outcome) => {
                    let _ = tx.send(TurnEvent::Completed(outcome)).await;
                }
                Err(AgentError::Cancelled) => {
                    tracing::debug!("turn abandoned by consumer");
                }
                Err(e) => {
                    let _ = tx.send(TurnEvent::Failed(e)).await;
                }
            }
        });
        TurnStream::new(rx, handle, debounce)
    }
}
