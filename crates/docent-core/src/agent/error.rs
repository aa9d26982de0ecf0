#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] docent_llm::LlmError),

    #[error(transparent)]
    Tool(#[from] docent_tools::ToolError),

    #[error("no final answer after {0} tool rounds")]
    ToolLoopExceeded(usize),

    #[error("turn cancelled")]
    Cancelled,
}

impl AgentError {
    /// Whether the model or a tool call failed, as opposed to the caller abandoning the turn.
    #[must_use]
    pub fn is_model_error(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}
