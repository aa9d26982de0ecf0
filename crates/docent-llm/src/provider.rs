use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Events from a streaming completion that may request tool calls.
pub type ToolChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Plain text message without structured parts.
    #[must_use]
    pub fn from_legacy(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            parts: Vec::new(),
        }
    }

    /// Message built from structured parts; `content` mirrors the joined text parts.
    #[must_use]
    pub fn from_parts(role: Role, parts: Vec<MessagePart>) -> Self {
        let content = parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");
        Self {
            role,
            content,
            parts,
        }
    }

    #[must_use]
    pub fn to_llm_content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn has_tool_parts(&self) -> bool {
        self.parts.iter().any(|p| {
            matches!(
                p,
                MessagePart::ToolUse { .. } | MessagePart::ToolResult { .. }
            )
        })
    }
}

/// Tool schema advertised to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolUseRequest {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChatResponse {
    Text(String),
    ToolUse {
        text: Option<String>,
        tool_calls: Vec<ToolUseRequest>,
    },
}

/// One item of a tool-aware stream. Tool calls are emitted once fully assembled.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCall(ToolUseRequest),
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the LLM and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    fn supports_streaming(&self) -> bool;

    /// Send messages together with tool definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> impl Future<Output = Result<ChatResponse, LlmError>> + Send;

    /// Streaming variant of [`LlmProvider::chat_with_tools`].
    ///
    /// The default implementation performs a blocking tool chat and replays the
    /// result as a stream: text first, then every tool call in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be started.
    fn chat_stream_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> impl Future<Output = Result<ToolChatStream, LlmError>> + Send {
        async move {
            let response = self.chat_with_tools(messages, tools).await?;
            Ok(response_to_stream(response))
        }
    }

    /// Request a response deserialized into `T`, guided by `T`'s JSON schema.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::StructuredParse`] when the output does not match `T`.
    fn chat_typed<T>(&self, messages: &[Message]) -> impl Future<Output = Result<T, LlmError>> + Send
    where
        T: serde::de::DeserializeOwned + schemars::JsonSchema + Send + 'static,
        Self: Sized,
    {
        async move {
            let schema = schema_value::<T>()?;
            let mut augmented = messages.to_vec();
            augmented.push(Message::from_legacy(
                Role::User,
                format!(
                    "Respond only with a JSON object that matches this JSON schema:\n{schema}"
                ),
            ));
            let raw = self.chat(&augmented).await?;
            parse_structured(&raw)
        }
    }

    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}

pub(crate) fn response_to_stream(response: ChatResponse) -> ToolChatStream {
    let events: Vec<Result<StreamEvent, LlmError>> = match response {
        ChatResponse::Text(text) => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Ok(StreamEvent::TextDelta(text))]
            }
        }
        ChatResponse::ToolUse { text, tool_calls } => text
            .filter(|t| !t.is_empty())
            .map(StreamEvent::TextDelta)
            .into_iter()
            .chain(tool_calls.into_iter().map(StreamEvent::ToolCall))
            .map(Ok)
            .collect(),
    };
    Box::pin(tokio_stream::iter(events))
}

/// JSON schema of `T` as a `serde_json::Value`.
///
/// # Errors
///
/// Returns an error if the generated schema cannot be serialized.
pub fn schema_value<T: schemars::JsonSchema>() -> Result<serde_json::Value, LlmError> {
    let schema = schemars::schema_for!(T);
    Ok(serde_json::to_value(&schema)?)
}

/// Parse a model's structured answer, tolerating a surrounding markdown code fence.
///
/// # Errors
///
/// Returns [`LlmError::StructuredParse`] if the payload is not valid JSON for `T`.
pub fn parse_structured<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim);
    serde_json::from_str(body).map_err(|e| LlmError::StructuredParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    #[derive(Debug, Deserialize, schemars::JsonSchema)]
    struct Answer {
        value: u32,
    }

    #[test]
    fn from_parts_joins_text() {
        let msg = Message::from_parts(
            Role::Assistant,
            vec![
                MessagePart::Text { text: "a".into() },
                MessagePart::ToolUse {
                    id: "1".into(),
                    name: "search".into(),
                    input: serde_json::json!({}),
                },
                MessagePart::Text { text: "b".into() },
            ],
        );
        assert_eq!(msg.content, "ab");
        assert!(msg.has_tool_parts());
    }

    #[test]
    fn legacy_message_has_no_tool_parts() {
        let msg = Message::from_legacy(Role::User, "hi");
        assert!(!msg.has_tool_parts());
        assert_eq!(msg.to_llm_content(), "hi");
    }

    #[test]
    fn parse_structured_plain() {
        let a: Answer = parse_structured(r#"{"value": 3}"#).unwrap();
        assert_eq!(a.value, 3);
    }

    #[test]
    fn parse_structured_fenced() {
        let a: Answer = parse_structured("```json\n{\"value\": 7}\n```").unwrap();
        assert_eq!(a.value, 7);
    }

    #[test]
    fn parse_structured_rejects_garbage() {
        let err = parse_structured::<Answer>("not json").unwrap_err();
        assert!(matches!(err, LlmError::StructuredParse(_)));
    }

    #[test]
    fn schema_value_mentions_fields() {
        let schema = schema_value::<Answer>().unwrap();
        assert!(schema.to_string().contains("value"));
    }

    #[tokio::test]
    async fn response_to_stream_orders_text_before_calls() {
        let call = ToolUseRequest {
            id: "c1".into(),
            name: "search".into(),
            input: serde_json::json!({"query": "x"}),
        };
        let stream = response_to_stream(ChatResponse::ToolUse {
            text: Some("thinking".into()),
            tool_calls: vec![call.clone()],
        });
        let events: Vec<_> = stream.map(Result::unwrap).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("thinking".into()),
                StreamEvent::ToolCall(call)
            ]
        );
    }

    #[tokio::test]
    async fn response_to_stream_skips_empty_text() {
        let stream = response_to_stream(ChatResponse::Text(String::new()));
        let events: Vec<_> = stream.collect().await;
        assert!(events.is_empty());
    }
}
