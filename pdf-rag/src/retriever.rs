//! Query-time retrieval: embed the query, then search the index.

use tracing::debug;

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Retrieve the `k` chunks most similar to `query`.
///
/// Errors from the embedder or from [`VectorIndex::search`] are returned
/// unchanged, so callers can inspect their kind.
pub async fn retrieve(
    query: &str,
    k: usize,
    embedder: &dyn EmbeddingProvider,
    index: &VectorIndex,
) -> Result<Vec<SearchResult>> {
    let query_vector = embedder.embed(query).await?;
    let results = index.search(&query_vector, k).await?;
    debug!(k, result_count = results.len(), "retrieved chunks");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::document::{Chunk, EmbeddedChunk};
    use crate::error::{RagError, ServiceErrorKind};

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            match text {
                "x" => Ok(vec![1.0, 0.0]),
                "y" => Ok(vec![0.0, 1.0]),
                _ => Err(RagError::service("axis", ServiceErrorKind::InputTooLong, text)),
            }
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    async fn two_entry_index() -> VectorIndex {
        let index = VectorIndex::new();
        index
            .add(&[
                EmbeddedChunk { chunk: Chunk::new("d", 0, "about x"), vector: vec![1.0, 0.1] },
                EmbeddedChunk { chunk: Chunk::new("d", 1, "about y"), vector: vec![0.1, 1.0] },
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn returns_closest_chunk_first() {
        let index = two_entry_index().await;
        let results = retrieve("y", 2, &AxisEmbedder, &index).await.unwrap();
        assert_eq!(results[0].chunk.text, "about y");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn embedder_errors_pass_through_unchanged() {
        let index = two_entry_index().await;
        let err = retrieve("zzz", 2, &AxisEmbedder, &index).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::ExternalService { kind: ServiceErrorKind::InputTooLong, .. }
        ));
    }

    #[tokio::test]
    async fn empty_index_error_passes_through() {
        let index = VectorIndex::new();
        let err = retrieve("x", 1, &AxisEmbedder, &index).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyIndex));
    }
}
