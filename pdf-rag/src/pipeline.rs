//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates ingestion (chunk → embed → index) and
//! question answering (retrieve → assemble context → generate) by composing
//! an [`EmbeddingProvider`], an [`AnswerGenerator`], a [`Chunker`], and a
//! shared [`VectorIndex`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pdf_rag::{CancellationToken, PdftotextExtractor, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generator(Arc::new(my_llm))
//!     .build()?;
//!
//! let report = pipeline
//!     .ingest_folder("data/documents", &PdftotextExtractor::new(), &CancellationToken::new())
//!     .await?;
//! let answer = pipeline.answer("When should kharif crops be sown?").await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, chunker_for};
use crate::config::RagConfig;
use crate::context::{assemble, render_prompt};
use crate::document::{Chunk, Document, EmbeddedChunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, ServiceErrorKind};
use crate::extract::{TextExtractor, discover_documents, source_name};
use crate::generation::AnswerGenerator;
use crate::index::VectorIndex;
use crate::retriever::retrieve;

/// A document that could not be ingested, with the reason.
#[derive(Debug)]
pub struct DocumentFailure {
    /// The source name of the failed document.
    pub source: String,
    /// What went wrong.
    pub error: RagError,
}

/// Outcome of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents whose chunks were committed to the index (including empty ones).
    pub documents_ingested: usize,
    /// Total chunks written to the index.
    pub chunks_added: usize,
    /// Documents skipped because extraction, embedding, or indexing failed.
    pub failures: Vec<DocumentFailure>,
}

impl IngestReport {
    /// Whether every document was ingested.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A generated answer together with the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The generator's output, unmodified.
    pub text: String,
    /// The retrieved chunks, best first.
    pub sources: Vec<SearchResult>,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`]. All collaborators are
/// injected; the pipeline holds no global state and makes exactly one attempt
/// per external call.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    chunker: Arc<dyn Chunker>,
    index: Arc<VectorIndex>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Ingest documents: chunk → embed → add, one document at a time.
    ///
    /// Each document is committed to the index atomically. A failure in one
    /// document is recorded in the report and does not stop the others.
    /// Chunk identifiers derive from `(source, ordinal)`, so ingesting the
    /// same documents again overwrites rather than duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Cancelled`] if `cancel` fires. Documents committed
    /// before cancellation stay in the index; the in-flight one is not added.
    pub async fn ingest(
        &self,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for document in documents {
            if cancel.is_cancelled() {
                return Err(RagError::Cancelled);
            }
            let outcome = self.ingest_document(&self.index, document, cancel).await;
            record(&mut report, &document.source, outcome)?;
        }
        log_report(&report);
        Ok(report)
    }

    /// Extract and ingest every matching file under `folder`.
    ///
    /// Source names are paths relative to `folder`. Extraction failures are
    /// isolated per document like any other ingestion failure.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotFound`] if `folder` does not exist.
    /// - [`RagError::Cancelled`] if `cancel` fires.
    pub async fn ingest_folder(
        &self,
        folder: impl AsRef<Path>,
        extractor: &dyn TextExtractor,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        self.ingest_folder_into(&self.index, folder.as_ref(), extractor, cancel).await
    }

    /// Rebuild the index from scratch out of the files under `folder`.
    ///
    /// The new contents are built aside and swapped in only when the run
    /// completes, so a cancelled or failed rebuild leaves the index as it was.
    ///
    /// # Errors
    ///
    /// Same as [`ingest_folder`](RagPipeline::ingest_folder).
    pub async fn rebuild(
        &self,
        folder: impl AsRef<Path>,
        extractor: &dyn TextExtractor,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let staging = VectorIndex::new();
        let report = self.ingest_folder_into(&staging, folder.as_ref(), extractor, cancel).await?;
        self.index.replace_with(staging).await;
        Ok(report)
    }

    /// Retrieve the `k` chunks most similar to `query`.
    ///
    /// # Errors
    ///
    /// Propagates embedder and index errors unchanged.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        retrieve(query, k, self.embedding_provider.as_ref(), &self.index).await.inspect_err(
            |e| error!(query, error = %e, "retrieval failed"),
        )
    }

    /// Answer `query` using the configured `top_k`, returning only the text.
    ///
    /// # Errors
    ///
    /// See [`answer_with_sources`](RagPipeline::answer_with_sources).
    pub async fn answer(&self, query: &str) -> Result<String> {
        Ok(self.answer_with_sources(query, self.config.top_k).await?.text)
    }

    /// Retrieve → assemble → prompt → generate.
    ///
    /// An empty retrieval still reaches the generator, with an empty context
    /// section in the prompt.
    ///
    /// # Errors
    ///
    /// Any stage's error is returned unchanged; nothing is retried.
    pub async fn answer_with_sources(&self, query: &str, k: usize) -> Result<Answer> {
        let sources = self.retrieve(query, k).await?;
        self.answer_from(query, sources).await
    }

    /// Assemble `sources` into a prompt for `query` and generate the answer.
    ///
    /// # Errors
    ///
    /// Returns the generator's error unchanged.
    pub async fn answer_from(&self, query: &str, sources: Vec<SearchResult>) -> Result<Answer> {
        let context = assemble(&sources);
        let prompt = render_prompt(&self.config.prompt_template, &context, query);

        let text = self.generator.generate(&prompt).await.inspect_err(|e| {
            error!(query, error = %e, "generation failed");
        })?;

        info!(result_count = sources.len(), answer_len = text.len(), "query completed");
        Ok(Answer { text, sources })
    }

    async fn ingest_folder_into(
        &self,
        index: &VectorIndex,
        folder: &Path,
        extractor: &dyn TextExtractor,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let files = discover_documents(folder, extractor.extensions())?;
        info!(folder = %folder.display(), files = files.len(), "ingesting folder");

        let mut report = IngestReport::default();
        for path in files {
            if cancel.is_cancelled() {
                return Err(RagError::Cancelled);
            }
            let source = source_name(folder, &path);
            let outcome = match extractor.extract(&path).await {
                Ok(text) => {
                    let document = Document::new(source.as_str(), text);
                    self.ingest_document(index, &document, cancel).await
                }
                Err(e) => Err(e),
            };
            record(&mut report, &source, outcome)?;
        }
        log_report(&report);
        Ok(report)
    }

    async fn ingest_document(
        &self,
        index: &VectorIndex,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        // 1. Chunk the document
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(source = %document.source, chunk_count = 0, "ingested document (empty)");
            return Ok(0);
        }

        // 2. Embed, racing cancellation
        let vectors = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RagError::Cancelled),
            vectors = self.embed_chunks(&chunks) => vectors?,
        };
        if vectors.len() != chunks.len() {
            return Err(RagError::service(
                "embedder",
                ServiceErrorKind::Failed,
                format!("returned {} vectors for {} chunks", vectors.len(), chunks.len()),
            ));
        }

        // 3. Attach embeddings and commit in one batch
        let entries: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();
        index.add(&entries).await?;

        let chunk_count = entries.len();
        info!(source = %document.source, chunk_count, "ingested document");
        Ok(chunk_count)
    }

    /// Embed chunk texts in ordinal order.
    ///
    /// With `embed_concurrency > 1` calls overlap, but `buffered` yields
    /// results in input order.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let provider = self.embedding_provider.as_ref();
        if self.config.embed_concurrency <= 1 {
            return provider.embed_batch(&texts).await;
        }
        stream::iter(texts)
            .map(|text| provider.embed(text))
            .buffered(self.config.embed_concurrency)
            .try_collect()
            .await
    }
}

fn record(report: &mut IngestReport, source: &str, outcome: Result<usize>) -> Result<()> {
    match outcome {
        Ok(chunk_count) => {
            report.documents_ingested += 1;
            report.chunks_added += chunk_count;
        }
        Err(RagError::Cancelled) => return Err(RagError::Cancelled),
        Err(error) => {
            warn!(source, error = %error, "document skipped");
            report.failures.push(DocumentFailure { source: source.to_string(), error });
        }
    }
    Ok(())
}

fn log_report(report: &IngestReport) {
    info!(
        documents = report.documents_ingested,
        chunks = report.chunks_added,
        failures = report.failures.len(),
        "ingestion finished"
    );
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `generator` are required. The config defaults to
/// [`RagConfig::default()`], the chunker to the one selected by the config,
/// and the index to a fresh empty [`VectorIndex`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(config)
///     .embedding_provider(Arc::new(embedder))
///     .generator(Arc::new(llm))
///     .index(Arc::new(VectorIndex::load("vectorstore").await?))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    chunker: Option<Arc<dyn Chunker>>,
    index: Option<Arc<VectorIndex>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the chunker derived from the config.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Use an existing (e.g. loaded) index.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the config is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => chunker_for(&config)?,
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            generator,
            chunker,
            index: self.index.unwrap_or_default(),
        })
    }
}
