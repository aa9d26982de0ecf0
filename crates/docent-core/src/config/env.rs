use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DOCENT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("DOCENT_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("DOCENT_LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse::<u32>() {
                self.llm.max_tokens = n;
            } else {
                tracing::warn!("ignoring invalid DOCENT_LLM_MAX_TOKENS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCENT_CORPUS_PATH") {
            self.corpus.paths = std::env::split_paths(&v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect::<Vec<PathBuf>>();
        }
        if let Ok(v) = std::env::var("DOCENT_CORPUS_PATH_FILTER") {
            self.corpus.path_filter = Some(v).filter(|f| !f.is_empty());
        }
        if let Ok(v) = std::env::var("DOCENT_CHUNKING_ENABLED") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.chunking.enabled = enabled;
            } else {
                tracing::warn!("ignoring invalid DOCENT_CHUNKING_ENABLED value: {v}");
            }
        }
        if let Ok(v) = std::env::var("DOCENT_STREAM_DEBOUNCE_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.streaming.debounce_ms = ms;
            } else {
                tracing::warn!("ignoring invalid DOCENT_STREAM_DEBOUNCE_MS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("LOGS_DIRECTORY")
            && !v.is_empty()
        {
            self.logs.directory = PathBuf::from(v);
        }
    }
}
