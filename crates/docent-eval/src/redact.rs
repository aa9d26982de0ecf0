//! Judge-safe copies of transcripts.

use docent_core::transcript::{ModelMessage, Part};

/// Stands in for every tool return payload.
pub const REDACTED_MARKER: &str = "RETURN_RESULTS_REDACTED";

/// Strip identifiers, timestamps and metadata, and hide tool payloads.
///
/// Only `kind` and `parts` survive at message level. Applying it twice yields
/// the same result as applying it once.
#[must_use]
pub fn redact(messages: &[ModelMessage]) -> Vec<ModelMessage> {
    messages
        .iter()
        .map(|m| ModelMessage {
            kind: m.kind,
            parts: m.parts.iter().map(redact_part).collect(),
            timestamp: None,
            model_name: None,
        })
        .collect()
}

fn redact_part(part: &Part) -> Part {
    match part {
        Part::UserPrompt { content, .. } => Part::UserPrompt {
            content: content.clone(),
            timestamp: None,
        },
        Part::ToolCall {
            tool_name, args, ..
        } => Part::ToolCall {
            tool_name: tool_name.clone(),
            args: args.clone(),
            tool_call_id: None,
        },
        Part::ToolReturn { tool_name, .. } => Part::ToolReturn {
            tool_name: tool_name.clone(),
            content: serde_json::Value::String(REDACTED_MARKER.to_owned()),
            tool_call_id: None,
            metadata: None,
            timestamp: None,
        },
        Part::Text { content, .. } => Part::Text {
            content: content.clone(),
            id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use docent_core::transcript::MessageKind;

    use super::*;

    fn transcript() -> Vec<ModelMessage> {
        vec![
            ModelMessage::request(vec![Part::UserPrompt {
                content: "How do I install it?".into(),
                timestamp: Some("2024-03-05T07:08:09Z".into()),
            }]),
            ModelMessage::response(
                vec![Part::ToolCall {
                    tool_name: "search".into(),
                    args: serde_json::json!({"query": "install"}),
                    tool_call_id: Some("call_1".into()),
                }],
                "gpt-4o-mini",
            ),
            ModelMessage::request(vec![Part::ToolReturn {
                tool_name: "search".into(),
                content: serde_json::json!([{"content": "pip install", "filename": "a.md"}]),
                tool_call_id: Some("call_1".into()),
                metadata: Some(serde_json::json!({"hits": 1})),
                timestamp: Some("2024-03-05T07:08:10Z".into()),
            }]),
            ModelMessage::response(
                vec![Part::Text {
                    content: "Run pip install.".into(),
                    id: Some("msg_1".into()),
                }],
                "gpt-4o-mini",
            ),
        ]
    }

    #[test]
    fn strips_per_part_fields() {
        let json = serde_json::to_value(redact(&transcript())).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"kind": "request", "parts": [
                    {"part_kind": "user-prompt", "content": "How do I install it?"}
                ]},
                {"kind": "response", "parts": [
                    {"part_kind": "tool-call", "tool_name": "search", "args": {"query": "install"}}
                ]},
                {"kind": "request", "parts": [
                    {"part_kind": "tool-return", "tool_name": "search", "content": REDACTED_MARKER}
                ]},
                {"kind": "response", "parts": [
                    {"part_kind": "text", "content": "Run pip install."}
                ]},
            ])
        );
    }

    #[test]
    fn source_is_untouched() {
        let original = transcript();
        let copy = original.clone();
        let _ = redact(&original);
        assert_eq!(original, copy);
    }

    #[test]
    fn transcript_without_search_has_no_tool_call() {
        let messages = vec![
            ModelMessage::request(vec![Part::UserPrompt {
                content: "hi".into(),
                timestamp: None,
            }]),
            ModelMessage::response(
                vec![Part::Text {
                    content: "hello".into(),
                    id: None,
                }],
                "gpt-4o-mini",
            ),
        ];
        let redacted = redact(&messages);
        assert!(redacted.iter().all(|m| m.tool_calls().next().is_none()));
        assert_eq!(redacted[1].kind, MessageKind::Response);
    }

    mod proptest_redact {
        use proptest::prelude::*;

        use super::*;

        fn opt_string() -> impl Strategy<Value = Option<String>> {
            proptest::option::of("[a-z0-9_:-]{0,12}")
        }

        fn part() -> impl Strategy<Value = Part> {
            prop_oneof![
                ("[ -~]{0,20}", opt_string())
                    .prop_map(|(content, timestamp)| Part::UserPrompt { content, timestamp }),
                ("[a-z]{1,8}", "[a-z ]{0,10}", opt_string()).prop_map(|(tool_name, q, id)| {
                    Part::ToolCall {
                        tool_name,
                        args: serde_json::json!({ "query": q }),
                        tool_call_id: id,
                    }
                }),
                ("[a-z]{1,8}", "[ -~]{0,20}", opt_string(), opt_string(), any::<bool>())
                    .prop_map(|(tool_name, content, id, timestamp, with_meta)| {
                        Part::ToolReturn {
                            tool_name,
                            content: serde_json::Value::String(content),
                            tool_call_id: id,
                            metadata: with_meta.then(|| serde_json::json!({"k": 1})),
                            timestamp,
                        }
                    }),
                ("[ -~]{0,20}", opt_string())
                    .prop_map(|(content, id)| Part::Text { content, id }),
            ]
        }

        fn message() -> impl Strategy<Value = ModelMessage> {
            (any::<bool>(), proptest::collection::vec(part(), 0..4), opt_string()).prop_map(
                |(is_request, parts, timestamp)| ModelMessage {
                    kind: if is_request {
                        MessageKind::Request
                    } else {
                        MessageKind::Response
                    },
                    parts,
                    timestamp,
                    model_name: None,
                },
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn redaction_is_idempotent(messages in proptest::collection::vec(message(), 0..6)) {
                let once = redact(&messages);
                prop_assert_eq!(redact(&once), once);
            }

            #[test]
            fn redaction_preserves_shape(messages in proptest::collection::vec(message(), 0..6)) {
                let redacted = redact(&messages);
                prop_assert_eq!(redacted.len(), messages.len());
                for (r, m) in redacted.iter().zip(&messages) {
                    prop_assert_eq!(r.kind, m.kind);
                    prop_assert_eq!(r.parts.len(), m.parts.len());
                }
            }
        }
    }
}
