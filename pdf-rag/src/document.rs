//! Data types for documents, chunks, and search results.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw text extracted from one source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The source name, usually a path relative to the ingested folder.
    pub source: String,
    /// The extracted text. May be empty.
    pub text: String,
}

impl Document {
    /// Create a document from a source name and its text.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A bounded substring of a [`Document`], the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Identifier derived from `(source, ordinal)`; see [`chunk_id`].
    pub id: String,
    /// The chunk text. Never empty.
    pub text: String,
    /// The source name of the parent document.
    pub source: String,
    /// Zero-based position of the chunk within its document.
    pub ordinal: usize,
}

impl Chunk {
    /// Create a chunk, deriving its identifier from the source and ordinal.
    pub fn new(source: impl Into<String>, ordinal: usize, text: impl Into<String>) -> Self {
        let source = source.into();
        Self { id: chunk_id(&source, ordinal), text: text.into(), source, ordinal }
    }
}

/// A [`Chunk`] with its embedding vector attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// The chunk itself.
    #[serde(flatten)]
    pub chunk: Chunk,
    /// The embedding of `chunk.text`.
    pub vector: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Stable chunk identifier: the first 32 hex digits of `SHA-256(source NUL ordinal)`.
///
/// Re-ingesting the same source with the same chunking parameters yields the
/// same identifiers, so the index overwrites instead of duplicating.
pub fn chunk_id(source: &str, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(ordinal.to_string().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash.chars().take(32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        assert_eq!(chunk_id("a.pdf", 0), chunk_id("a.pdf", 0));
        assert_ne!(chunk_id("a.pdf", 0), chunk_id("a.pdf", 1));
        assert_ne!(chunk_id("a.pdf", 0), chunk_id("b.pdf", 0));
        assert_eq!(chunk_id("a.pdf", 7).len(), 32);
    }

    #[test]
    fn separator_prevents_source_ordinal_collisions() {
        assert_ne!(chunk_id("doc1", 1), chunk_id("doc", 11));
    }

    #[test]
    fn embedded_chunk_serializes_flat() {
        let entry = EmbeddedChunk { chunk: Chunk::new("a.pdf", 2, "text"), vector: vec![1.0] };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["source"], "a.pdf");
        assert_eq!(value["ordinal"], 2);
        assert_eq!(value["vector"][0], 1.0);
    }
}
