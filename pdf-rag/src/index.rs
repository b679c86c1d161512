//! In-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] maps chunk identifiers to [`EmbeddedChunk`]s behind a
//! `tokio::sync::RwLock`. Writers (`add`, `clear`, `save`) take the write
//! lock, so a search never observes a partially applied batch. Search is an
//! exact O(n) scan.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::validate_top_k;
use crate::document::{EmbeddedChunk, SearchResult};
use crate::error::{RagError, Result};
use crate::persist;

#[derive(Debug, Default)]
struct IndexState {
    /// Established by the first successful insertion.
    dimensions: Option<usize>,
    entries: HashMap<String, EmbeddedChunk>,
}

/// A vector index with exact top-K cosine search and directory persistence.
///
/// Duplicate identifiers follow a last-write-wins policy: adding an entry
/// whose id is already present replaces the stored entry. Because chunk ids
/// are derived from `(source, ordinal)`, re-ingesting a document overwrites
/// its previous chunks.
///
/// # Example
///
/// ```rust,ignore
/// use pdf_rag::VectorIndex;
///
/// let index = VectorIndex::new();
/// index.add(&embedded_chunks).await?;
/// let results = index.search(&query_vector, 3).await?;
/// index.save("vectorstore").await?;
/// ```
#[derive(Debug, Default)]
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create a new empty index. Its dimensionality is set by the first `add`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert all entries, or none of them.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyEmbedding`] if any vector has length zero.
    /// - [`RagError::NonFiniteEmbedding`] if any component is NaN or infinite.
    /// - [`RagError::DimensionMismatch`] if any vector's length differs from the
    ///   established dimensionality (or, for the first insertion, from the
    ///   first vector in the batch).
    ///
    /// On error the index is left unchanged.
    pub async fn add(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut state = self.state.write().await;

        let mut dimensions = state.dimensions;
        for entry in chunks {
            let actual = entry.vector.len();
            if actual == 0 {
                return Err(RagError::EmptyEmbedding { id: entry.chunk.id.clone() });
            }
            if !is_finite(&entry.vector) {
                return Err(RagError::NonFiniteEmbedding { id: entry.chunk.id.clone() });
            }
            match dimensions {
                None => dimensions = Some(actual),
                Some(expected) if expected != actual => {
                    return Err(RagError::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
            }
        }

        state.dimensions = dimensions;
        for entry in chunks {
            state.entries.insert(entry.chunk.id.clone(), entry.clone());
        }
        debug!(added = chunks.len(), total = state.entries.len(), "index add committed");
        Ok(())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Ties in score are broken by ordinal ascending, then identifier
    /// ascending. If `k` exceeds the number of entries, all entries are
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `k == 0`.
    /// - [`RagError::EmptyIndex`] if the index holds no entries.
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong length.
    /// - [`RagError::NonFiniteEmbedding`] if `query` contains NaN or infinity.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        validate_top_k(k)?;
        if !is_finite(query) {
            return Err(RagError::NonFiniteEmbedding { id: "query".to_string() });
        }
        let state = self.state.read().await;
        if state.entries.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        if let Some(expected) = state.dimensions {
            if query.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: query.len() });
            }
        }

        let mut scored: Vec<(&EmbeddedChunk, f32)> = state
            .entries
            .values()
            .map(|entry| (entry, cosine_similarity(&entry.vector, query)))
            .collect();
        scored.sort_by(|(a, a_score), (b, b_score)| rank(a, *a_score, b, *b_score));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(entry, score)| SearchResult { chunk: entry.chunk.clone(), score })
            .collect())
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the index holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// The established dimensionality, if any entry has been added.
    pub async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }

    /// Distinct source names, sorted.
    pub async fn sources(&self) -> Vec<String> {
        let state = self.state.read().await;
        let sources: BTreeSet<&str> =
            state.entries.values().map(|e| e.chunk.source.as_str()).collect();
        sources.into_iter().map(str::to_string).collect()
    }

    /// A copy of every entry, ordered by source, then ordinal.
    pub async fn entries(&self) -> Vec<EmbeddedChunk> {
        let state = self.state.read().await;
        sorted_entries(&state).into_iter().cloned().collect()
    }

    /// Remove every entry and forget the dimensionality.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.dimensions = None;
        info!("index cleared");
    }

    /// Replace this index's contents with those of `other` in one step.
    ///
    /// Searches see either the old contents or the new ones, never a mix.
    pub async fn replace_with(&self, other: VectorIndex) {
        let next = other.state.into_inner();
        let mut state = self.state.write().await;
        *state = next;
        info!(entries = state.entries.len(), "index contents replaced");
    }

    /// Persist all entries and the dimensionality to the directory `path`.
    ///
    /// Holds the write lock for the duration so no `add` interleaves.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyIndex`] if there is nothing to save.
    /// - [`RagError::Io`] if the directory or files cannot be written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let state = self.state.write().await;
        let Some(dimensions) = state.dimensions else {
            return Err(RagError::EmptyIndex);
        };

        let entries = sorted_entries(&state);
        persist::write_bundle(path, dimensions, &entries).await?;
        info!(path = %path.display(), entries = entries.len(), dimensions, "index saved");
        Ok(())
    }

    /// Restore an index previously written by [`save`](VectorIndex::save).
    ///
    /// # Errors
    ///
    /// - [`RagError::NotFound`] if `path` holds no persisted index.
    /// - [`RagError::CorruptIndex`] if the payload fails validation.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (dimensions, entries) = persist::read_bundle(path).await?;
        let count = entries.len();
        let entries = entries.into_iter().map(|e| (e.chunk.id.clone(), e)).collect();
        info!(path = %path.display(), entries = count, dimensions, "index loaded");
        Ok(Self { state: RwLock::new(IndexState { dimensions: Some(dimensions), entries }) })
    }
}

fn sorted_entries(state: &IndexState) -> Vec<&EmbeddedChunk> {
    let mut entries: Vec<&EmbeddedChunk> = state.entries.values().collect();
    entries.sort_by(|a, b| {
        a.chunk
            .source
            .cmp(&b.chunk.source)
            .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    entries
}

/// Descending score, then ascending ordinal, then ascending id.
fn rank(a: &EmbeddedChunk, a_score: f32, b: &EmbeddedChunk, b_score: f32) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}

fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|v| v.is_finite())
}

/// Compute cosine similarity between two vectors.
///
/// Accumulates in `f64` so large components do not overflow. Returns 0.0 if
/// either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f32
}
