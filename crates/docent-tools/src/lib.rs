//! Tool execution for the docent agent.

pub mod executor;
pub mod registry;
pub mod search;

pub use executor::{ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params};
pub use registry::{ToolDef, ToolRegistry};
pub use search::{SEARCH_RESULT_LIMIT, SearchParams, SearchTool};
