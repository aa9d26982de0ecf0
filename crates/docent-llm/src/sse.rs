use std::collections::{BTreeMap, VecDeque};

use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;

use crate::error::LlmError;
use crate::provider::{StreamEvent, ToolChatStream, ToolUseRequest};

/// Convert an `OpenAI` streaming tool-chat response into a `ToolChatStream`.
///
/// Text deltas pass through immediately. Tool call fragments are accumulated by
/// index and emitted once the choice finishes, on `[DONE]`, or at end of stream.
pub(crate) fn openai_sse_to_tool_stream(response: reqwest::Response) -> ToolChatStream {
    let state = ToolStreamState {
        inner: Box::pin(response.bytes_stream().eventsource()),
        acc: ToolCallAccumulator::default(),
        pending: VecDeque::new(),
        finished: false,
    };
    let stream = futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(event)) => st.acc.ingest(&event.data, &mut st.pending),
                Some(Err(e)) => st.pending.push_back(Err(LlmError::SseParse(e.to_string()))),
                None => {
                    st.finished = true;
                    st.acc.flush(&mut st.pending);
                }
            }
        }
    });
    Box::pin(stream)
}

type EventStream = std::pin::Pin<
    Box<
        dyn futures::Stream<
                Item = Result<
                    eventsource_stream::Event,
                    eventsource_stream::EventStreamError<reqwest::Error>,
                >,
            > + Send,
    >,
>;

struct ToolStreamState {
    inner: EventStream,
    acc: ToolCallAccumulator,
    pending: VecDeque<Result<StreamEvent, LlmError>>,
    finished: bool,
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

#[derive(Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    fn ingest(&mut self, data: &str, out: &mut VecDeque<Result<StreamEvent, LlmError>>) {
        if data == "[DONE]" {
            self.flush(out);
            return;
        }

        let chunk = match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                out.push_back(Err(LlmError::SseParse(format!(
                    "failed to parse SSE data: {e}"
                ))));
                return;
            }
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return;
        };

        if let Some(content) = choice.delta.content
            && !content.is_empty()
        {
            out.push_back(Ok(StreamEvent::TextDelta(content)));
        }

        for fragment in choice.delta.tool_calls.unwrap_or_default() {
            let entry = self.calls.entry(fragment.index).or_default();
            if let Some(id) = fragment.id {
                entry.id = id;
            }
            if let Some(function) = fragment.function {
                if let Some(name) = function.name {
                    entry.name.push_str(&name);
                }
                if let Some(args) = function.arguments {
                    entry.arguments.push_str(&args);
                }
            }
        }

        if choice.finish_reason.is_some() {
            self.flush(out);
        }
    }

    fn flush(&mut self, out: &mut VecDeque<Result<StreamEvent, LlmError>>) {
        for (_, call) in std::mem::take(&mut self.calls) {
            let input = if call.arguments.trim().is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                    tracing::warn!(tool = %call.name, "invalid tool call arguments: {e}");
                    serde_json::Value::Object(serde_json::Map::new())
                })
            };
            out.push_back(Ok(StreamEvent::ToolCall(ToolUseRequest {
                id: call.id,
                name: call.name,
                input,
            })));
        }
    }
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Deserialize)]
struct OpenAiToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Deserialize)]
struct OpenAiFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(acc: &mut ToolCallAccumulator, chunks: &[&str]) -> Vec<StreamEvent> {
        let mut out = VecDeque::new();
        for c in chunks {
            acc.ingest(c, &mut out);
        }
        out.into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn accumulator_ignores_empty_content_and_done() {
        let mut acc = ToolCallAccumulator::default();
        let events = drain(
            &mut acc,
            &[r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#, "[DONE]"],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn accumulator_assembles_fragmented_call() {
        let mut acc = ToolCallAccumulator::default();
        let events = drain(
            &mut acc,
            &[
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"search","arguments":""}}]}}]}"#,
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"query\":"}}]}}]}"#,
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"join\"}"}}]}}]}"#,
                r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            ],
        );
        assert_eq!(
            events,
            vec![StreamEvent::ToolCall(ToolUseRequest {
                id: "call_1".into(),
                name: "search".into(),
                input: serde_json::json!({"query": "join"}),
            })]
        );
    }

    #[test]
    fn accumulator_emits_calls_in_index_order() {
        let mut acc = ToolCallAccumulator::default();
        let events = drain(
            &mut acc,
            &[
                r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"b","function":{"name":"search","arguments":"{}"}}]}}]}"#,
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"a","function":{"name":"search","arguments":"{}"}}]}}]}"#,
                "[DONE]",
            ],
        );
        let ids: Vec<_> = events
            .iter()
            .map(|e| match e {
                StreamEvent::ToolCall(c) => c.id.as_str(),
                StreamEvent::TextDelta(_) => "",
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn accumulator_passes_text_through() {
        let mut acc = ToolCallAccumulator::default();
        let events = drain(
            &mut acc,
            &[
                r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
                r#"{"choices":[{"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
            ],
        );
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Hel".into()),
                StreamEvent::TextDelta("lo".into())
            ]
        );
    }

    #[test]
    fn accumulator_invalid_arguments_fall_back_to_empty_object() {
        let mut acc = ToolCallAccumulator::default();
        let events = drain(
            &mut acc,
            &[
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"x","function":{"name":"search","arguments":"{oops"}}]},"finish_reason":"tool_calls"}]}"#,
            ],
        );
        assert_eq!(
            events,
            vec![StreamEvent::ToolCall(ToolUseRequest {
                id: "x".into(),
                name: "search".into(),
                input: serde_json::json!({}),
            })]
        );
    }

    #[test]
    fn accumulator_reports_bad_chunk() {
        let mut acc = ToolCallAccumulator::default();
        let mut out = VecDeque::new();
        acc.ingest("{broken", &mut out);
        assert!(matches!(out.pop_front(), Some(Err(LlmError::SseParse(_)))));
    }
}
