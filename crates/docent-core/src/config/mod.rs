mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_secrets();
        Ok(config)
    }

    /// Reject settings that would fail later in the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error for zero chunk size or step, an empty agent name, or
    /// a zero tool iteration limit.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunking.size == 0 {
            anyhow::bail!("chunking.size must be greater than 0");
        }
        if self.chunking.step == 0 {
            anyhow::bail!("chunking.step must be greater than 0");
        }
        if self.agent.name.trim().is_empty() {
            anyhow::bail!("agent.name must not be empty");
        }
        if !crate::logs::is_valid_agent_name(&self.agent.name) {
            anyhow::bail!(
                "agent.name {:?} must not contain path separators or '..'",
                self.agent.name
            );
        }
        if self.agent.max_tool_iterations == 0 {
            anyhow::bail!("agent.max_tool_iterations must be greater than 0");
        }
        if self.corpus.paths.is_empty() {
            anyhow::bail!("corpus.paths must list at least one directory");
        }
        Ok(())
    }

    /// Agent instructions with repository placeholders filled in.
    #[must_use]
    pub fn instructions(&self) -> String {
        self.agent
            .instructions
            .replace("{repo_owner}", &self.corpus.repo_owner)
            .replace("{repo_name}", &self.corpus.repo_name)
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.streaming.debounce_ms)
    }

    /// Read the API key from the environment. The file never carries it.
    pub(crate) fn resolve_secrets(&mut self) {
        self.secrets.openai_api_key = ["DOCENT_OPENAI_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
            .map(Secret::new);
    }
}
