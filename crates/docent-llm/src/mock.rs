//! Test-only mock LLM provider.

use std::sync::{Arc, Mutex};

use crate::provider::{
    ChatResponse, LlmProvider, Message, StreamEvent, ToolChatStream, ToolDefinition,
};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    tool_responses: Arc<Mutex<Vec<ChatResponse>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    pub default_response: String,
    pub model: String,
    pub streaming: bool,
    pub fail_chat: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
    /// Milliseconds to sleep before each streamed event.
    pub chunk_delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            tool_responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            model: "mock-model".into(),
            streaming: false,
            fail_chat: false,
            delay_ms: 0,
            chunk_delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// Scripted answers for `chat_with_tools`, consumed in order. Once exhausted,
    /// tool chats fall back to plain text responses.
    #[must_use]
    pub fn with_tool_responses(responses: Vec<ChatResponse>) -> Self {
        Self {
            tool_responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    #[must_use]
    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = ms;
        self
    }

    /// Every message list this provider has been called with.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    async fn next_text(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        self.next_text(messages).await
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ChatResponse, crate::LlmError> {
        let scripted = {
            let mut tool_responses = self.tool_responses.lock().unwrap();
            if tool_responses.is_empty() {
                None
            } else {
                Some(tool_responses.remove(0))
            }
        };
        match scripted {
            Some(response) => {
                self.requests.lock().unwrap().push(messages.to_vec());
                if self.fail_chat {
                    return Err(crate::LlmError::Other("mock LLM error".into()));
                }
                Ok(response)
            }
            None => self.next_text(messages).await.map(ChatResponse::Text),
        }
    }

    /// Streams text one character per event so consumers see many small deltas.
    async fn chat_stream_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ToolChatStream, crate::LlmError> {
        let response = self.chat_with_tools(messages, tools).await?;
        let (text, calls) = match response {
            ChatResponse::Text(text) => (text, Vec::new()),
            ChatResponse::ToolUse { text, tool_calls } => (text.unwrap_or_default(), tool_calls),
        };
        let events: Vec<_> = text
            .chars()
            .map(|c| StreamEvent::TextDelta(c.to_string()))
            .chain(calls.into_iter().map(StreamEvent::ToolCall))
            .map(Ok)
            .collect();
        if self.chunk_delay_ms == 0 {
            return Ok(Box::pin(tokio_stream::iter(events)));
        }
        let pause = std::time::Duration::from_millis(self.chunk_delay_ms);
        Ok(Box::pin(futures::StreamExt::then(
            tokio_stream::iter(events),
            move |event| async move {
                tokio::time::sleep(pause).await;
                event
            },
        )))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
