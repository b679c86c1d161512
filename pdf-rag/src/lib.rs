//! # pdf-rag
//!
//! Retrieval-augmented question answering over PDF documents.
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! [`VectorIndex`]. At query time the most similar chunks are retrieved,
//! joined into a context block, and handed to an [`AnswerGenerator`] together
//! with the question.
//!
//! The embedding model, the language model, and PDF text extraction are
//! injected through the [`EmbeddingProvider`], [`AnswerGenerator`], and
//! [`TextExtractor`] traits. Enable the `ollama` feature for HTTP backends
//! talking to an Ollama server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pdf_rag::{CancellationToken, PdftotextExtractor, RagConfig, RagPipeline};
//! use pdf_rag::ollama::{OllamaEmbeddingProvider, OllamaGenerator};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().chunk_size(800).chunk_overlap(150).top_k(3).build()?)
//!     .embedding_provider(Arc::new(OllamaEmbeddingProvider::new("http://localhost:11434")))
//!     .generator(Arc::new(OllamaGenerator::new("http://localhost:11434")))
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! pipeline.ingest_folder("data/documents", &PdftotextExtractor::new(), &cancel).await?;
//! pipeline.index().save("vectorstore").await?;
//!
//! println!("{}", pipeline.answer("Which crops suit sandy soil?").await?);
//! ```

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
mod persist;
pub mod pipeline;
pub mod retriever;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunk_text, chunker_for};
pub use config::{ChunkStrategy, DEFAULT_PROMPT_TEMPLATE, RagConfig, RagConfigBuilder};
pub use context::{assemble, render_prompt};
pub use document::{Chunk, Document, EmbeddedChunk, SearchResult, chunk_id};
pub use embedding::EmbeddingProvider;
pub use error::{ErrorKind, RagError, Result, ServiceErrorKind};
pub use extract::{
    PdftotextExtractor, PlainTextExtractor, TextExtractor, discover_documents, source_name,
};
pub use generation::AnswerGenerator;
pub use index::VectorIndex;
pub use pipeline::{Answer, DocumentFailure, IngestReport, RagPipeline, RagPipelineBuilder};
pub use retriever::retrieve;

/// Re-exported so callers can construct tokens without a direct dependency.
pub use tokio_util::sync::CancellationToken;
