//! Documentation corpus chunking and free-text retrieval.
//!
//! A corpus is loaded once from a [`corpus::CorpusSource`], optionally split
//! into overlapping windows by [`chunker`], and indexed by [`index::Index`].
//! The index is immutable after build and safe to share between readers.

pub mod chunker;
pub mod corpus;
pub mod document;
pub mod error;
pub mod index;

pub use chunker::{Window, chunk_documents, sliding_window};
pub use corpus::{CorpusSource, DirectorySource, LoadedCorpus};
pub use document::{Chunk, Document};
pub use error::{IndexError, Result};
pub use index::{Index, IndexFields, ScoredChunk, SearchQuery};
