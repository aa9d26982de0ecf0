//! The `search` tool: bounded top-k retrieval over the corpus index.

use std::sync::Arc;

use docent_index::{Chunk, Index};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::executor::{ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params};
use crate::registry::ToolDef;

/// Maximum number of items a single search returns.
pub const SEARCH_RESULT_LIMIT: usize = 5;

const SEARCH_TOOL_ID: &str = "search";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// The search query string.
    pub query: String,
}

/// Stateless adapter over one built [`Index`].
#[derive(Debug, Clone)]
pub struct SearchTool {
    index: Arc<Index>,
}

impl SearchTool {
    #[must_use]
    pub fn new(index: Arc<Index>) -> Self {
        Self { index }
    }

    /// Top matches for `query`, at most [`SEARCH_RESULT_LIMIT`].
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Chunk> {
        self.index
            .search(query, SEARCH_RESULT_LIMIT)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl ToolExecutor for SearchTool {
    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![ToolDef {
            id: SEARCH_TOOL_ID,
            description: "Search the documentation index for entries matching the given query. \
                          Returns up to 5 matching items, each with its content and filename.",
            schema: schemars::schema_for!(SearchParams),
        }]
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        if call.tool_id != SEARCH_TOOL_ID {
            return Ok(None);
        }

        let params: SearchParams = deserialize_params(&call.params)?;
        let results = self.search(&params.query);
        tracing::debug!(query = %params.query, hits = results.len(), "search executed");

        let payload =
            serde_json::to_value(&results).map_err(|e| ToolError::Execution(e.to_string()))?;
        let summary = payload.to_string();

        Ok(Some(ToolOutput {
            tool_name: SEARCH_TOOL_ID.to_owned(),
            summary,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use docent_index::{Document, IndexFields};

    use super::*;

    fn tool_with(docs: usize) -> SearchTool {
        let items = (0..docs)
            .map(|i| {
                Chunk::whole(&Document::new(
                    format!("docs/page{i}.md"),
                    format!("shared topic page number {i}"),
                ))
            })
            .collect();
        SearchTool::new(Arc::new(Index::build(items, &IndexFields::default())))
    }

    fn call(query: serde_json::Value) -> ToolCall {
        ToolCall::from_json("search", &serde_json::json!({ "query": query }))
    }

    #[test]
    fn declares_single_search_tool() {
        let defs = tool_with(0).tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].id, "search");
        assert_eq!(defs[0].parameters()["required"][0], "query");
    }

    #[test]
    fn results_capped_at_five() {
        assert_eq!(tool_with(12).search("shared topic").len(), SEARCH_RESULT_LIMIT);
    }

    #[tokio::test]
    async fn execute_returns_content_and_filename() {
        let out = tool_with(2)
            .execute_tool_call(&call(serde_json::json!("topic")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.tool_name, "search");
        let items = out.payload.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0]["content"].is_string());
        assert!(items[0]["filename"].as_str().unwrap().starts_with("docs/"));
        assert_eq!(out.summary, out.payload.to_string());
    }

    #[tokio::test]
    async fn empty_index_returns_empty_list() {
        let out = tool_with(0)
            .execute_tool_call(&call(serde_json::json!("anything")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.payload, serde_json::json!([]));
    }

    #[tokio::test]
    async fn other_tool_ids_not_handled() {
        let other = ToolCall::from_json("bash", &serde_json::json!({}));
        assert!(tool_with(1).execute_tool_call(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let bad = ToolCall::from_json("search", &serde_json::json!({}));
        let err = tool_with(1).execute_tool_call(&bad).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }
}
