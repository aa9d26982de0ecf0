use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Keys every serialized chunk carries itself. Metadata entries with these
/// names are dropped on output.
const CHUNK_FIELDS: [&str; 3] = ["start", "content", "filename"];

/// A single corpus file. Identity is `path`, relative to the corpus root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A retrievable unit: a window of a document's content plus the document's
/// other fields, copied unchanged.
///
/// Serialized flat, so the retrieval tool exposes `start`, `content`,
/// `filename` and every other metadata key side by side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chunk {
    /// Character offset of this window in the parent document's content.
    pub start: usize,
    pub content: String,
    #[serde(rename = "filename")]
    pub path: String,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// The whole document as a single item, used when chunking is disabled.
    #[must_use]
    pub fn whole(doc: &Document) -> Self {
        Self {
            start: 0,
            content: doc.content.clone(),
            path: doc.path.clone(),
            metadata: doc.metadata.clone(),
        }
    }

    /// Metadata entries that do not clash with the chunk's own fields.
    pub fn extra_metadata(&self) -> impl Iterator<Item = (&String, &String)> {
        self.metadata
            .iter()
            .filter(|(key, _)| !CHUNK_FIELDS.contains(&key.as_str()))
    }

    /// Look up a named field the way the index sees it.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "content" => Some(&self.content),
            "filename" | "path" => Some(&self.path),
            other => self.metadata.get(other).map(String::as_str),
        }
    }
}

impl Serialize for Chunk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("start", &self.start)?;
        map.serialize_entry("content", &self.content)?;
        map.serialize_entry("filename", &self.path)?;
        for (key, value) in self.extra_metadata() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
