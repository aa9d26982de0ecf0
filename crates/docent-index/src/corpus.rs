//! Loading a documentation snapshot from disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{IndexError, Result};

/// Documents produced by a [`CorpusSource`], plus how many entries were skipped.
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<Document>,
    pub skipped: usize,
}

/// Anything that can hand over a corpus as `{path, content, metadata}` documents.
pub trait CorpusSource {
    /// # Errors
    ///
    /// Returns [`IndexError::CorpusLoad`] when no document could be read at all.
    fn load(&self) -> Result<LoadedCorpus>;
}

/// Reads markdown files from an unpacked snapshot directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
    strip_root_segment: bool,
    path_filter: Option<String>,
}

impl DirectorySource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["md".into(), "mdx".into()],
            strip_root_segment: false,
            path_filter: None,
        }
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Drop the first path segment, e.g. the `repo-main/` folder of an unpacked archive.
    #[must_use]
    pub fn with_strip_root_segment(mut self, strip: bool) -> Self {
        self.strip_root_segment = strip;
        self
    }

    /// Keep only documents whose relative path contains `filter`.
    #[must_use]
    pub fn with_path_filter(mut self, filter: Option<String>) -> Self {
        self.path_filter = filter.filter(|f| !f.is_empty());
        self
    }

    fn wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|w| w.eq_ignore_ascii_case(ext)))
    }

    fn relative_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if self.strip_root_segment && segments.len() > 1 {
            segments[1..].join("/")
        } else {
            segments.join("/")
        }
    }
}

impl CorpusSource for DirectorySource {
    fn load(&self) -> Result<LoadedCorpus> {
        if !self.root.is_dir() {
            return Err(IndexError::CorpusLoad(format!(
                "corpus root {} is not a directory",
                self.root.display()
            )));
        }

        let mut entries: Vec<PathBuf> = ignore::WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|p| self.wanted_extension(p))
            .collect();
        entries.sort();

        let mut corpus = LoadedCorpus::default();
        let mut candidates = 0usize;

        for path in entries {
            let rel_path = self.relative_path(&path);
            if let Some(ref filter) = self.path_filter
                && !rel_path.contains(filter.as_str())
            {
                continue;
            }
            candidates += 1;

            let bytes = match std::fs::read(&path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable document: {e}");
                    corpus.skipped += 1;
                    continue;
                }
            };
            if bytes.contains(&0) {
                tracing::warn!(path = %path.display(), "skipping binary document");
                corpus.skipped += 1;
                continue;
            }

            let text = String::from_utf8_lossy(&bytes);
            let (metadata, body) = split_front_matter(&text);
            corpus.documents.push(Document {
                path: rel_path,
                content: body.to_owned(),
                metadata,
            });
        }

        if candidates > 0 && corpus.documents.is_empty() {
            return Err(IndexError::CorpusLoad(format!(
                "none of {candidates} documents under {} could be read",
                self.root.display()
            )));
        }

        tracing::info!(
            documents = corpus.documents.len(),
            skipped = corpus.skipped,
            root = %self.root.display(),
            "corpus loaded"
        );
        Ok(corpus)
    }
}

/// Split a leading `---` block of `key: value` lines from the body.
///
/// Text without a closed front-matter block is returned whole with empty metadata.
/// Nested or list values are not interpreted.
#[must_use]
pub fn split_front_matter(text: &str) -> (BTreeMap<String, String>, &str) {
    let mut metadata = BTreeMap::new();

    let Some(after_open) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (metadata, text);
    };

    let mut offset = 0;
    let mut close = None;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            close = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let Some((header_end, body_start)) = close else {
        return (metadata, text);
    };

    for line in after_open[..header_end].lines() {
        if line.starts_with(char::is_whitespace) || line.trim_start().starts_with('-') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !key.is_empty() && !value.is_empty() {
                metadata.insert(key.to_owned(), value.to_owned());
            }
        }
    }

    (metadata, after_open[body_start..].trim_start_matches(['\r', '\n']))
}
