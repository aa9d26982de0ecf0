use std::collections::HashMap;
use std::fmt;

/// Structured tool invocation from LLM.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub tool_id: String,
    pub params: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    /// Build a call from a JSON arguments object. Non-object arguments yield no params.
    #[must_use]
    pub fn from_json(tool_id: impl Into<String>, args: &serde_json::Value) -> Self {
        let params = args
            .as_object()
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self {
            tool_id: tool_id.into(),
            params,
        }
    }
}

/// Structured result from tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool_name: String,
    /// Text handed back to the model.
    pub summary: String,
    /// Machine-readable result, recorded in transcripts.
    pub payload: serde_json::Value,
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("invalid tool parameters: {message}")]
    InvalidParams { message: String },

    #[error("execution failed: {0}")]
    Execution(String),
}

/// Deserialize tool call params from a `HashMap<String, Value>` into a typed struct.
///
/// # Errors
///
/// Returns `ToolError::InvalidParams` when deserialization fails.
pub fn deserialize_params<T: serde::de::DeserializeOwned, S: std::hash::BuildHasher>(
    params: &HashMap<String, serde_json::Value, S>,
) -> Result<T, ToolError> {
    let obj =
        serde_json::Value::Object(params.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    serde_json::from_value(obj).map_err(|e| ToolError::InvalidParams {
        message: e.to_string(),
    })
}

/// Async trait for tool execution backends.
pub trait ToolExecutor: Send + Sync {
    /// Return tool definitions this executor can handle.
    fn tool_definitions(&self) -> Vec<crate::registry::ToolDef>;

    /// Execute a structured tool call. Returns `None` if `tool_id` is not handled.
    fn execute_tool_call(
        &self,
        call: &ToolCall,
    ) -> impl Future<Output = Result<Option<ToolOutput>, ToolError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct QueryParams {
        query: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    fn params(json: serde_json::Value) -> HashMap<String, serde_json::Value> {
        ToolCall::from_json("search", &json).params
    }

    #[test]
    fn tool_output_display() {
        let output = ToolOutput {
            tool_name: "search".to_owned(),
            summary: "[]".to_owned(),
            payload: serde_json::json!([]),
        };
        assert_eq!(output.to_string(), "[]");
    }

    #[test]
    fn from_json_non_object_has_no_params() {
        let call = ToolCall::from_json("search", &serde_json::json!("oops"));
        assert_eq!(call.tool_id, "search");
        assert!(call.params.is_empty());
    }

    #[test]
    fn deserialize_params_valid() {
        let p: QueryParams = deserialize_params(&params(serde_json::json!({"query": "joins"}))).unwrap();
        assert_eq!(p.query, "joins");
        assert!(p.limit.is_none());
    }

    #[test]
    fn deserialize_params_missing_required_field() {
        let err = deserialize_params::<QueryParams, _>(&params(serde_json::json!({}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }

    #[test]
    fn deserialize_params_wrong_type() {
        let err =
            deserialize_params::<QueryParams, _>(&params(serde_json::json!({"query": 5}))).unwrap_err();
        assert!(err.to_string().starts_with("invalid tool parameters"));
    }

    #[test]
    fn deserialize_params_ignores_extra_fields() {
        let p: QueryParams =
            deserialize_params(&params(serde_json::json!({"query": "q", "extra": true}))).unwrap();
        assert_eq!(p.query, "q");
    }
}
