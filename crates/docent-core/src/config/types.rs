use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_INSTRUCTIONS: &str = "\
You are a helpful assistant that answers questions about the {repo_owner}/{repo_name} documentation.

Use the search tool to find relevant information before answering questions.

If you can find specific information through search, use it to provide accurate answers.

Always include references by citing the filename of the source material you used.
Replace it with the full path to the GitHub repository:
\"https://github.com/{repo_owner}/{repo_name}/blob/main/\"
Format: [LINK TITLE](FULL_GITHUB_LINK)

If the search doesn't return relevant results, let the user know and provide general guidance.

Be concise but comprehensive. Use bullet points and clear formatting when appropriate.";

pub(crate) const DEFAULT_QUESTION_PROMPT: &str = "\
You are helping to create test questions for an AI agent that answers questions about a documentation corpus.

Based on the provided documents, generate realistic questions that users might ask.

The questions should:

- Be natural and varied in style
- Range from simple to complex
- Include both specific technical questions and general questions

Generate one question for each record.";

/// API key that never appears in `Debug` or `Display` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Secrets resolved from the environment after load. Never read from the file.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub datagen: DatagenConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_agent_name() -> String {
    "docs_agent".into()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.into()
}

fn default_max_tool_iterations() -> usize {
    10
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// System instructions; `{repo_owner}` and `{repo_name}` are substituted.
    #[serde(default = "default_instructions")]
    pub instructions: String,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: default_instructions(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

fn default_corpus_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("docs")]
}

fn default_repo_owner() -> String {
    "owner".into()
}

fn default_repo_name() -> String {
    "docs".into()
}

fn default_extensions() -> Vec<String> {
    vec!["md".into(), "mdx".into()]
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Local snapshot directories, loaded in order into one index.
    #[serde(default = "default_corpus_paths")]
    pub paths: Vec<PathBuf>,
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Drop the first path segment, as left behind by an unpacked archive.
    #[serde(default)]
    pub strip_root_segment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_filter: Option<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            paths: default_corpus_paths(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            extensions: default_extensions(),
            strip_root_segment: false,
            path_filter: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    2000
}

fn default_chunk_step() -> usize {
    1000
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_step")]
    pub step: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: default_chunk_size(),
            step: default_chunk_step(),
        }
    }
}

fn default_text_fields() -> Vec<String> {
    vec!["content".into(), "filename".into(), "title".into()]
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_text_fields")]
    pub text_fields: Vec<String>,
    #[serde(default)]
    pub keyword_fields: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            text_fields: default_text_fields(),
            keyword_fields: Vec::new(),
        }
    }
}

fn default_logs_directory() -> PathBuf {
    PathBuf::from("logs")
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogsConfig {
    #[serde(default = "default_logs_directory")]
    pub directory: PathBuf,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            directory: default_logs_directory(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StreamingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Coalescing window for answer deltas; zero disables coalescing.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EvalConfig {
    #[serde(default = "default_model")]
    pub judge_model: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            judge_model: default_model(),
        }
    }
}

fn default_sample_size() -> usize {
    10
}

fn default_question_prompt() -> String {
    DEFAULT_QUESTION_PROMPT.into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatagenConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_question_prompt")]
    pub instructions: String,
}

impl Default for DatagenConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            sample_size: default_sample_size(),
            instructions: default_question_prompt(),
        }
    }
}
