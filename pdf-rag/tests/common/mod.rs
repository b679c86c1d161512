//! Deterministic stand-ins for the embedding model and the language model.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use pdf_rag::{AnswerGenerator, EmbeddingProvider, RagError, Result, ServiceErrorKind};

/// Hash-based embeddings: identical text always maps to the same unit vector.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("FAIL") {
            return Err(RagError::service(
                "mock",
                ServiceErrorKind::ModelUnavailable,
                "refusing to embed FAIL",
            ));
        }
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Embeds by keyword: each axis counts occurrences of one keyword.
pub struct KeywordEmbedder {
    keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&'static str]) -> Self {
        Self { keywords: keywords.to_vec() }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(self.keywords.iter().map(|k| lower.matches(k).count() as f32).collect())
    }

    fn dimensions(&self) -> usize {
        self.keywords.len()
    }
}

/// Never completes; used to exercise cancellation.
pub struct PendingEmbedder;

#[async_trait]
impl EmbeddingProvider for PendingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        std::future::pending().await
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Records every prompt and answers with a fixed string.
#[derive(Default)]
pub struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("  generated answer\n".to_string())
    }
}

/// Always fails as if the prompt exceeded the model's window.
pub struct OverflowGenerator;

#[async_trait]
impl AnswerGenerator for OverflowGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::service("mock", ServiceErrorKind::ContextTooLong, "prompt too long"))
    }
}
