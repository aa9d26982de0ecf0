//! Error types for docent-index.

/// Errors that can occur while chunking, loading or indexing a corpus.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Chunking was requested with a zero window size or step.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The corpus could not be loaded at all.
    #[error("corpus load failed: {0}")]
    CorpusLoad(String),

    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
