//! LLM provider abstraction and the OpenAI-compatible backend.

pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
pub(crate) mod sse;

pub use error::LlmError;
pub use provider::{
    ChatResponse, LlmProvider, Message, MessagePart, Role, StreamEvent,
    ToolChatStream, ToolDefinition, ToolUseRequest,
};
