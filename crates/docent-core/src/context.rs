//! Application context: everything built once at startup and passed down.

use std::sync::Arc;

use anyhow::Context;
use docent_index::{
    Chunk, CorpusSource, DirectorySource, Document, Index, IndexFields, chunk_documents,
};
use docent_llm::openai::OpenAiProvider;
use docent_llm::provider::LlmProvider;
use docent_tools::SearchTool;

use crate::agent::Agent;
use crate::config::Config;
use crate::logs::LogStore;

/// Documents loaded from every configured corpus directory.
#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub skipped: usize,
}

/// Load every configured directory into one document list, in config order.
///
/// # Errors
///
/// Returns an error if any configured directory cannot be loaded at all.
pub fn load_corpus(config: &Config) -> anyhow::Result<Corpus> {
    let mut corpus = Corpus::default();
    for root in &config.corpus.paths {
        let loaded = DirectorySource::new(root)
            .with_extensions(config.corpus.extensions.clone())
            .with_strip_root_segment(config.corpus.strip_root_segment)
            .with_path_filter(config.corpus.path_filter.clone())
            .load()
            .with_context(|| format!("failed to load corpus from {}", root.display()))?;
        tracing::info!(
            root = %root.display(),
            documents = loaded.documents.len(),
            skipped = loaded.skipped,
            "corpus loaded"
        );
        corpus.documents.extend(loaded.documents);
        corpus.skipped += loaded.skipped;
    }
    Ok(corpus)
}

/// Turn documents into index items, chunked or whole per config.
///
/// # Errors
///
/// Returns an error for invalid chunking parameters.
pub fn prepare_items(config: &Config, documents: &[Document]) -> anyhow::Result<Vec<Chunk>> {
    if config.chunking.enabled {
        chunk_documents(documents, config.chunking.size, config.chunking.step)
            .context("failed to chunk documents")
    } else {
        Ok(documents.iter().map(Chunk::whole).collect())
    }
}

#[must_use]
pub fn index_fields(config: &Config) -> IndexFields {
    IndexFields {
        text: config.index.text_fields.clone(),
        keyword: config.index.keyword_fields.clone(),
    }
}

/// OpenAI-compatible provider for `model`.
///
/// # Errors
///
/// Returns an error if no API key was found in the environment.
pub fn create_provider(config: &Config, model: &str) -> anyhow::Result<OpenAiProvider> {
    let api_key = config
        .secrets
        .openai_api_key
        .as_ref()
        .context("no API key: set DOCENT_OPENAI_API_KEY or OPENAI_API_KEY")?;
    let provider = OpenAiProvider::new(
        api_key.expose().to_owned(),
        config.llm.base_url.clone(),
        model.to_owned(),
        config.llm.max_tokens,
    );
    Ok(match config.llm.temperature {
        Some(t) => provider.with_temperature(t),
        None => provider,
    })
}

pub struct AppContext<P> {
    config: Config,
    documents: Vec<Document>,
    index: Arc<Index>,
    agent: Agent<P, SearchTool>,
    log_store: LogStore,
}

impl AppContext<OpenAiProvider> {
    /// Build the full context against the configured OpenAI-compatible backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus cannot be loaded or no API key is set.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let provider = create_provider(&config, &config.llm.model)?;
        Self::with_provider(config, provider)
    }
}

impl<P: LlmProvider> AppContext<P> {
    /// Build the context with an explicit provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the corpus cannot be loaded.
    pub fn with_provider(config: Config, provider: P) -> anyhow::Result<Self> {
        config.validate()?;

        let corpus = load_corpus(&config)?;
        let items = prepare_items(&config, &corpus.documents)?;
        let item_count = items.len();
        let index = Arc::new(Index::build(items, &index_fields(&config)));
        tracing::info!(
            documents = corpus.documents.len(),
            items = item_count,
            skipped = corpus.skipped,
            chunking = config.chunking.enabled,
            "index built"
        );

        let tool = Arc::new(SearchTool::new(Arc::clone(&index)));
        let agent = Agent::new(
            Arc::new(provider),
            tool,
            config.agent.name.clone(),
            config.instructions(),
        )
        .with_max_tool_iterations(config.agent.max_tool_iterations);
        let log_store = LogStore::new(config.logs.directory.clone());

        Ok(Self {
            config,
            documents: corpus.documents,
            index,
            agent,
            log_store,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loaded documents, before chunking.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn agent(&self) -> &Agent<P, SearchTool> {
        &self.agent
    }

    #[must_use]
    pub fn log_store(&self) -> &LogStore {
        &self.log_store
    }
}

#[cfg(test)]
mod tests {
    use docent_llm::mock::MockProvider;

    use super::*;

    fn write_corpus(dir: &std::path::Path) {
        std::fs::create_dir_all(dir.join("guides")).unwrap();
        std::fs::write(
            dir.join("guides/joins.md"),
            "---\ntitle: Joins\n---\nA join combines rows from two tables.",
        )
        .unwrap();
        std::fs::write(dir.join("guides/indexes.mdx"), "Indexes speed up lookups.").unwrap();
        std::fs::write(dir.join("notes.txt"), "not documentation").unwrap();
    }

    fn config_for(corpus: &std::path::Path, logs: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.corpus.paths = vec![corpus.to_path_buf()];
        config.logs.directory = logs.to_path_buf();
        config
    }

    #[test]
    fn builds_index_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(&dir.path().join("docs"));
        let config = config_for(&dir.path().join("docs"), &dir.path().join("logs"));

        let ctx = AppContext::with_provider(config, MockProvider::default()).unwrap();
        assert_eq!(ctx.documents().len(), 2);
        assert_eq!(ctx.index().len(), 2);
        assert_eq!(ctx.agent().name(), "docs_agent");
        assert_eq!(ctx.agent().tool_names(), ["search".to_owned()]);

        let hits = ctx.index().search("join tables", 5);
        assert_eq!(hits[0].path, "guides/joins.md");
        assert_eq!(hits[0].metadata.get("title").map(String::as_str), Some("Joins"));
    }

    #[test]
    fn chunking_splits_long_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("long.md"), "x".repeat(25)).unwrap();

        let mut config = config_for(&docs, &dir.path().join("logs"));
        config.chunking.size = 10;
        config.chunking.step = 5;
        let ctx = AppContext::with_provider(config, MockProvider::default()).unwrap();
        assert_eq!(ctx.index().len(), 4);
    }

    #[test]
    fn chunking_disabled_keeps_whole_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("long.md"), "x".repeat(25)).unwrap();

        let mut config = config_for(&docs, &dir.path().join("logs"));
        config.chunking.enabled = false;
        config.chunking.size = 10;
        let items = prepare_items(&config, &load_corpus(&config).unwrap().documents).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, 0);
    }

    #[test]
    fn merges_multiple_roots() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(&dir.path().join("a"));
        write_corpus(&dir.path().join("b"));
        let mut config = config_for(&dir.path().join("a"), &dir.path().join("logs"));
        config.corpus.paths.push(dir.path().join("b"));

        assert_eq!(load_corpus(&config).unwrap().documents.len(), 4);
    }

    #[test]
    fn missing_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir.path().join("absent"), &dir.path().join("logs"));
        assert!(AppContext::with_provider(config, MockProvider::default()).is_err());
    }

    #[test]
    fn provider_requires_api_key() {
        let config = Config::default();
        assert!(create_provider(&config, "gpt-4o-mini").is_err());
    }
}
