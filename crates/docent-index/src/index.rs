//! In-memory TF-IDF index over chunk fields.
//!
//! Each text field gets its own vocabulary and inverse document frequencies,
//! computed once at build time with smoothing (`ln((1 + n) / (1 + df)) + 1`).
//! Field vectors are l2-normalised, so a field's score is the cosine
//! similarity between the query and that field. The item score is the
//! boost-weighted sum over fields.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::Chunk;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "do", "does", "for", "from", "had", "has", "have", "he", "her",
    "his", "how", "if", "in", "into", "is", "it", "its", "may", "me", "more", "most", "my", "no",
    "not", "of", "on", "or", "our", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "to", "too", "us", "was",
    "we", "were", "what", "when", "where", "which", "while", "who", "why", "will", "with", "would",
    "you", "your",
];

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}

/// Which chunk fields are searched as free text and which are exact-match filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFields {
    pub text: Vec<String>,
    pub keyword: Vec<String>,
}

impl Default for IndexFields {
    fn default() -> Self {
        Self {
            text: vec!["content".into(), "filename".into(), "title".into()],
            keyword: Vec::new(),
        }
    }
}

type SparseVec = Vec<(usize, f32)>;

#[derive(Debug)]
struct FieldIndex {
    name: String,
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
    vectors: Vec<SparseVec>,
}

impl FieldIndex {
    #[allow(clippy::cast_precision_loss)]
    fn build(name: &str, items: &[Chunk]) -> Self {
        let mut vocab: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        let mut counts: Vec<HashMap<usize, usize>> = Vec::with_capacity(items.len());

        for item in items {
            let mut tf: HashMap<usize, usize> = HashMap::new();
            for token in tokenize(item.field(name).unwrap_or_default()) {
                let next_id = vocab.len();
                let id = *vocab.entry(token).or_insert(next_id);
                if id == df.len() {
                    df.push(0);
                }
                *tf.entry(id).or_insert(0) += 1;
            }
            for id in tf.keys() {
                df[*id] += 1;
            }
            counts.push(tf);
        }

        let n = items.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        let vectors = counts
            .into_iter()
            .map(|tf| {
                normalize(
                    tf.into_iter()
                        .map(|(id, c)| (id, c as f32 * idf[id]))
                        .collect(),
                )
            })
            .collect();

        Self {
            name: name.to_owned(),
            vocab,
            idf,
            vectors,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn query_vector(&self, query: &str) -> SparseVec {
        let mut tf: HashMap<usize, usize> = HashMap::new();
        for token in tokenize(query) {
            if let Some(&id) = self.vocab.get(&token) {
                *tf.entry(id).or_insert(0) += 1;
            }
        }
        normalize(
            tf.into_iter()
                .map(|(id, c)| (id, c as f32 * self.idf[id]))
                .collect(),
        )
    }
}

fn normalize(mut v: SparseVec) -> SparseVec {
    v.sort_unstable_by_key(|(id, _)| *id);
    let norm = v.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut v {
            *w /= norm;
        }
    }
    v
}

fn dot(a: &SparseVec, b: &SparseVec) -> f32 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Parameters for [`Index::search_with`].
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub text: &'a str,
    pub top_k: usize,
    /// Per-field score multiplier; fields not listed use 1.0.
    pub boosts: HashMap<String, f32>,
    /// Keyword field equality filters, all of which must match.
    pub filters: HashMap<String, String>,
}

impl<'a> SearchQuery<'a> {
    #[must_use]
    pub fn new(text: &'a str, top_k: usize) -> Self {
        Self {
            text,
            top_k,
            boosts: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    #[must_use]
    pub fn boost(mut self, field: impl Into<String>, weight: f32) -> Self {
        self.boosts.insert(field.into(), weight);
        self
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub score: f32,
    pub chunk: &'a Chunk,
}

/// Immutable free-text index. Built once; every query is a pure read.
#[derive(Debug)]
pub struct Index {
    items: Vec<Chunk>,
    fields: Vec<FieldIndex>,
    keyword_fields: Vec<String>,
}

impl Index {
    #[must_use]
    pub fn build(items: Vec<Chunk>, fields: &IndexFields) -> Self {
        let field_indexes = fields
            .text
            .iter()
            .map(|name| FieldIndex::build(name, &items))
            .collect();
        tracing::info!(
            items = items.len(),
            text_fields = ?fields.text,
            "corpus index built"
        );
        Self {
            items,
            fields: field_indexes,
            keyword_fields: fields.keyword.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Top `top_k` items for `query`, most relevant first.
    #[must_use]
    pub fn search(&self, query: &str, top_k: usize) -> Vec<&Chunk> {
        self.search_with(&SearchQuery::new(query, top_k))
            .into_iter()
            .map(|hit| hit.chunk)
            .collect()
    }

    /// Scored search with boosts and keyword filters.
    ///
    /// Only items with a positive score are returned. Ties keep corpus order.
    #[must_use]
    pub fn search_with(&self, query: &SearchQuery<'_>) -> Vec<ScoredChunk<'_>> {
        if self.items.is_empty() || query.top_k == 0 {
            return Vec::new();
        }

        let mut scores = vec![0.0f32; self.items.len()];
        for field in &self.fields {
            let boost = query.boosts.get(&field.name).copied().unwrap_or(1.0);
            if boost == 0.0 {
                continue;
            }
            let q = field.query_vector(query.text);
            if q.is_empty() {
                continue;
            }
            for (score, vector) in scores.iter_mut().zip(&field.vectors) {
                *score += boost * dot(&q, vector);
            }
        }

        let mut hits: Vec<ScoredChunk<'_>> = self
            .items
            .iter()
            .zip(scores)
            .filter(|(item, score)| *score > 0.0 && self.matches_filters(item, &query.filters))
            .map(|(chunk, score)| ScoredChunk { score, chunk })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(query.top_k);
        hits
    }

    fn matches_filters(&self, item: &Chunk, filters: &HashMap<String, String>) -> bool {
        filters.iter().all(|(field, value)| {
            if !self.keyword_fields.iter().any(|k| k == field) {
                tracing::debug!(field = %field, "filter on undeclared keyword field ignored");
                return true;
            }
            item.field(field) == Some(value.as_str())
        })
    }
}
