use docent_llm::provider::{LlmProvider, MessagePart, ToolDefinition, ToolUseRequest};
use docent_tools::{ToolCall, ToolError, ToolExecutor};
use tokio::sync::mpsc;
use tracing::Instrument;

use super::{Agent, AgentError, TurnEvent};
use crate::transcript::{Part, now_timestamp};

impl<P: LlmProvider, T: ToolExecutor> Agent<P, T> {
    /// Execute the requested calls in order.
    ///
    /// Returns the transcript parts and the provider message parts that carry
    /// the results back to the model.
    pub(super) async fn execute_tool_calls(
        &self,
        calls: &[ToolUseRequest],
        sink: Option<&mpsc::Sender<TurnEvent>>,
    ) -> Result<(Vec<Part>, Vec<MessagePart>), AgentError> {
        let mut returns = Vec::with_capacity(calls.len());
        let mut results = Vec::with_capacity(calls.len());

        for (idx, request) in calls.iter().enumerate() {
            if let Some(tx) = sink {
                tx.send(TurnEvent::ToolCall {
                    name: request.name.clone(),
                    args: request.input.clone(),
                })
                .await
                .map_err(|_| AgentError::Cancelled)?;
            }

            let call = ToolCall::from_json(request.name.as_str(), &request.input);
            let span = tracing::info_span!("tool_exec", tool_name = %request.name, idx = %idx);
            let output = self
                .tools
                .execute_tool_call(&call)
                .instrument(span)
                .await?
                .ok_or_else(|| ToolError::UnknownTool {
                    name: request.name.clone(),
                })?;

            returns.push(Part::ToolReturn {
                tool_name: output.tool_name.clone(),
                content: output.payload,
                tool_call_id: Some(request.id.clone()),
                metadata: None,
                timestamp: Some(now_timestamp()),
            });
            results.push(MessagePart::ToolResult {
                tool_use_id: request.id.clone(),
                content: output.summary,
                is_error: false,
            });
        }

        Ok((returns, results))
    }
}

pub(super) fn tool_def_to_definition(def: &docent_tools::ToolDef) -> ToolDefinition {
    let mut params = def.parameters();
    if let serde_json::Value::Object(ref mut map) = params {
        map.remove("$schema");
        map.remove("title");
    }
    ToolDefinition {
        name: def.id.to_owned(),
        description: def.description.to_owned(),
        parameters: params,
    }
}
