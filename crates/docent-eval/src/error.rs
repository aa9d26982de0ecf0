#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The judge answered, but not with a checklist. The record is skipped.
    #[error("judge output could not be parsed: {0}")]
    JudgeParse(String),

    #[error("log record has no messages")]
    EmptyTranscript,

    #[error(transparent)]
    Llm(docent_llm::LlmError),

    #[error("failed to read log directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<docent_llm::LlmError> for EvalError {
    fn from(e: docent_llm::LlmError) -> Self {
        match e {
            docent_llm::LlmError::StructuredParse(msg) => Self::JudgeParse(msg),
            other => Self::Llm(other),
        }
    }
}

impl EvalError {
    /// Whether the failure only affects one record.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::JudgeParse(_) | Self::EmptyTranscript)
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
