//! Ollama embedding and generation backends.
//!
//! This module is only available when the `ollama` feature is enabled. Both
//! types call a local or remote Ollama server over its REST API:
//! `POST /api/embed` for embeddings and `POST /api/generate` (non-streaming)
//! for answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, ServiceErrorKind};
use crate::generation::AnswerGenerator;

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model (all-MiniLM-L6-v2).
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";

/// The dimensionality of [`DEFAULT_EMBED_MODEL`].
pub const DEFAULT_EMBED_DIMENSIONS: usize = 384;

/// The default generation model.
pub const DEFAULT_GENERATE_MODEL: &str = "mistral";

const SERVICE: &str = "ollama";

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// Inputs longer than the model's context are rejected (`truncate: false`)
/// and surface as [`ServiceErrorKind::InputTooLong`].
///
/// # Example
///
/// ```rust,ignore
/// use pdf_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("http://localhost:11434");
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for the server at `base_url` using the default model.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(base_url.into()),
            model: DEFAULT_EMBED_MODEL.into(),
            dimensions: DEFAULT_EMBED_DIMENSIONS,
        }
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality the model produces.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }
}

/// An [`AnswerGenerator`] backed by Ollama's `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a generator for the server at `base_url` using the default model.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(base_url.into()),
            model: DEFAULT_GENERATE_MODEL.into(),
        }
    }

    /// Set the model name (e.g. `llama3`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Map an unsuccessful HTTP status and error message to a failure mode.
///
/// `too_long` is the kind reported for length errors: `InputTooLong` for
/// embeddings, `ContextTooLong` for generation.
fn classify(status: u16, message: &str, too_long: ServiceErrorKind) -> ServiceErrorKind {
    let lower = message.to_ascii_lowercase();
    if status == 404 || status == 502 || status == 503 || lower.contains("not found") {
        ServiceErrorKind::ModelUnavailable
    } else if lower.contains("context length") || lower.contains("too long") {
        too_long
    } else {
        ServiceErrorKind::Failed
    }
}

async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
    body: &Req,
    too_long: ServiceErrorKind,
) -> Result<Resp> {
    let response = client.post(url).json(body).send().await.map_err(|e| {
        error!(provider = SERVICE, error = %e, "request failed");
        let kind = if e.is_connect() || e.is_timeout() {
            ServiceErrorKind::ModelUnavailable
        } else {
            ServiceErrorKind::Failed
        };
        RagError::service(SERVICE, kind, format!("request to {url} failed: {e}"))
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

        error!(provider = SERVICE, %status, "API error");
        return Err(RagError::service(
            SERVICE,
            classify(status.as_u16(), &detail, too_long),
            format!("API returned {status}: {detail}"),
        ));
    }

    response.json().await.map_err(|e| {
        error!(provider = SERVICE, error = %e, "failed to parse response");
        RagError::service(
            SERVICE,
            ServiceErrorKind::Failed,
            format!("failed to parse response: {e}"),
        )
    })
}

// ── Trait implementations ──────────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| {
            RagError::service(SERVICE, ServiceErrorKind::Failed, "API returned no embeddings")
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = SERVICE,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request = EmbedRequest { model: &self.model, input: texts.to_vec(), truncate: false };
        let url = format!("{}/api/embed", self.base_url);
        let response: EmbedResponse =
            post_json(&self.client, &url, &request, ServiceErrorKind::InputTooLong).await?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::service(
                SERVICE,
                ServiceErrorKind::Failed,
                format!("expected {} embeddings, got {}", texts.len(), response.embeddings.len()),
            ));
        }
        Ok(response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = SERVICE, model = %self.model, prompt_len = prompt.len(), "generating");

        let request = GenerateRequest { model: &self.model, prompt, stream: false };
        let url = format!("{}/api/generate", self.base_url);
        let response: GenerateResponse =
            post_json(&self.client, &url, &request, ServiceErrorKind::ContextTooLong).await?;
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_are_unavailable() {
        let kind = classify(404, "model 'mistral' not found", ServiceErrorKind::ContextTooLong);
        assert_eq!(kind, ServiceErrorKind::ModelUnavailable);
        assert_eq!(
            classify(503, "", ServiceErrorKind::InputTooLong),
            ServiceErrorKind::ModelUnavailable
        );
    }

    #[test]
    fn length_errors_use_the_callers_kind() {
        let message = "the input length exceeds the context length";
        assert_eq!(
            classify(400, message, ServiceErrorKind::InputTooLong),
            ServiceErrorKind::InputTooLong
        );
        assert_eq!(
            classify(500, message, ServiceErrorKind::ContextTooLong),
            ServiceErrorKind::ContextTooLong
        );
    }

    #[test]
    fn other_errors_are_generic_failures() {
        assert_eq!(classify(500, "boom", ServiceErrorKind::InputTooLong), ServiceErrorKind::Failed);
    }

    #[test]
    fn embed_request_disables_truncation() {
        let request = EmbedRequest { model: "all-minilm", input: vec!["a"], truncate: false };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["truncate"], false);
        assert_eq!(json["input"][0], "a");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let generator = OllamaGenerator::new("http://host:11434/");
        assert_eq!(generator.base_url, "http://host:11434");
    }

    #[tokio::test]
    async fn unreachable_server_is_model_unavailable() {
        // Port 9 (discard) is closed on test machines; connect fails fast.
        let provider = OllamaEmbeddingProvider::new("http://127.0.0.1:9");
        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
