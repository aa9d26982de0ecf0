//! Turn transcript: the message sequence persisted in interaction logs and
//! replayed by the evaluation harness.
//!
//! Parts are a tagged variant keyed by `part_kind`. Optional identifiers,
//! timestamps and metadata are omitted from JSON when absent, so a redacted
//! transcript serializes without them.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current UTC time in RFC 3339 with microseconds, as stored in transcripts.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Sent to the model: the user prompt or tool results.
    Request,
    /// Produced by the model: text and tool calls.
    Response,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum Part {
    UserPrompt {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ToolCall {
        tool_name: String,
        args: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    ToolReturn {
        tool_name: String,
        content: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Text {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Part {
    /// Text carried by prompt and text parts.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::UserPrompt { content, .. } | Self::Text { content, .. } => Some(content),
            Self::ToolCall { .. } | Self::ToolReturn { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub kind: MessageKind,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl ModelMessage {
    #[must_use]
    pub fn request(parts: Vec<Part>) -> Self {
        Self {
            kind: MessageKind::Request,
            parts,
            timestamp: Some(now_timestamp()),
            model_name: None,
        }
    }

    #[must_use]
    pub fn response(parts: Vec<Part>, model_name: &str) -> Self {
        Self {
            kind: MessageKind::Response,
            parts,
            timestamp: Some(now_timestamp()),
            model_name: Some(model_name.to_owned()),
        }
    }

    /// Joined text of all prompt and text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect()
    }

    #[must_use]
    pub fn tool_calls(&self) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::ToolCall { .. }))
    }
}

/// The user's question: text of the first message.
#[must_use]
pub fn question_of(messages: &[ModelMessage]) -> Option<String> {
    messages.first().map(ModelMessage::text)
}

/// The agent's answer: text of the last message, or of the last message that
/// has any text when the turn ended on unexecuted tool returns.
#[must_use]
pub fn answer_of(messages: &[ModelMessage]) -> Option<String> {
    let last = messages.last()?;
    let text = last.text();
    if !text.is_empty() {
        return Some(text);
    }
    messages
        .iter()
        .rev()
        .filter(|m| m.kind == MessageKind::Response)
        .map(ModelMessage::text)
        .find(|t| !t.is_empty())
        .or(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ModelMessage> {
        vec![
            ModelMessage::request(vec![Part::UserPrompt {
                content: "What is a join?".into(),
                timestamp: Some(now_timestamp()),
            }]),
            ModelMessage::response(
                vec![Part::ToolCall {
                    tool_name: "search".into(),
                    args: serde_json::json!({"query": "join"}),
                    tool_call_id: Some("call_1".into()),
                }],
                "gpt-4o-mini",
            ),
            ModelMessage::request(vec![Part::ToolReturn {
                tool_name: "search".into(),
                content: serde_json::json!([]),
                tool_call_id: Some("call_1".into()),
                metadata: None,
                timestamp: Some(now_timestamp()),
            }]),
            ModelMessage::response(
                vec![Part::Text {
                    content: "A join combines tables.".into(),
                    id: None,
                }],
                "gpt-4o-mini",
            ),
        ]
    }

    #[test]
    fn part_kind_tags() {
        let json = serde_json::to_value(&sample()).unwrap();
        assert_eq!(json[0]["kind"], "request");
        assert_eq!(json[0]["parts"][0]["part_kind"], "user-prompt");
        assert_eq!(json[1]["parts"][0]["part_kind"], "tool-call");
        assert_eq!(json[2]["parts"][0]["part_kind"], "tool-return");
        assert_eq!(json[3]["parts"][0]["part_kind"], "text");
        assert!(json[3]["parts"][0].get("id").is_none());
        assert!(json[2]["parts"][0].get("metadata").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let messages = sample();
        let json = serde_json::to_string(&messages).unwrap();
        let back: Vec<ModelMessage> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, messages);
    }

    #[test]
    fn question_and_answer() {
        let messages = sample();
        assert_eq!(question_of(&messages).unwrap(), "What is a join?");
        assert_eq!(answer_of(&messages).unwrap(), "A join combines tables.");
    }

    #[test]
    fn answer_skips_trailing_tool_returns() {
        let mut messages = sample();
        messages.push(ModelMessage::request(vec![Part::ToolReturn {
            tool_name: "search".into(),
            content: serde_json::json!([]),
            tool_call_id: None,
            metadata: None,
            timestamp: None,
        }]));
        assert_eq!(answer_of(&messages).unwrap(), "A join combines tables.");
    }

    #[test]
    fn empty_transcript_has_no_question() {
        assert!(question_of(&[]).is_none());
        assert!(answer_of(&[]).is_none());
    }

    #[test]
    fn timestamps_parse_as_rfc3339() {
        assert!(chrono::DateTime::parse_from_rfc3339(&now_timestamp()).is_ok());
    }
}
