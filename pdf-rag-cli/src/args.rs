//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf_rag::ollama::{
    DEFAULT_BASE_URL, DEFAULT_EMBED_DIMENSIONS, DEFAULT_EMBED_MODEL, DEFAULT_GENERATE_MODEL,
    OllamaEmbeddingProvider, OllamaGenerator,
};
use pdf_rag::{
    ChunkStrategy, PdftotextExtractor, PlainTextExtractor, RagConfig, TextExtractor,
};

/// Ask questions about a folder of PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-rag",
    version,
    about,
    long_about = None,
    after_help = "Exit codes: 0 success, 1 configuration error, 2 missing input, \
                  3 external-service failure, 130 interrupted"
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Chunk, embed, and add every document in a folder to the index
    Ingest {
        /// Folder to scan recursively
        folder: PathBuf,
    },

    /// Answer a single question from the index
    Query {
        /// The question
        text: String,
        /// Number of chunks to retrieve
        #[arg(long, short, default_value_t = 3)]
        k: usize,
        /// Also print the retrieved chunks
        #[arg(long)]
        show_sources: bool,
    },

    /// Discard the index and rebuild it from the documents folder
    RebuildIndex {
        /// Folder to scan (defaults to --docs-dir)
        folder: Option<PathBuf>,
    },

    /// Interactive question loop; builds the index first if none exists
    Chat {
        /// Number of chunks to retrieve per question
        #[arg(long, short, default_value_t = 3)]
        k: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Directory holding the persisted index
    #[arg(long, global = true, env = "PDF_RAG_INDEX_DIR", default_value = "vectorstore")]
    pub index_dir: PathBuf,

    /// Default documents folder for `chat` and `rebuild-index`
    #[arg(long, global = true, env = "PDF_RAG_DOCS_DIR", default_value = "data/documents")]
    pub docs_dir: PathBuf,

    /// Ollama server address
    #[arg(long, global = true, env = "OLLAMA_HOST", default_value = DEFAULT_BASE_URL)]
    pub ollama_url: String,

    /// Embedding model name
    #[arg(long, global = true, env = "PDF_RAG_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    pub embed_model: String,

    /// Dimensionality of the embedding model
    #[arg(long, global = true, default_value_t = DEFAULT_EMBED_DIMENSIONS)]
    pub embed_dimensions: usize,

    /// Generation model name
    #[arg(
        long,
        global = true,
        env = "PDF_RAG_GENERATE_MODEL",
        default_value = DEFAULT_GENERATE_MODEL
    )]
    pub generate_model: String,

    /// Maximum characters per chunk
    #[arg(long, global = true, default_value_t = 800)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, default_value_t = 150)]
    pub chunk_overlap: usize,

    /// How chunk boundaries are chosen
    #[arg(long, global = true, value_enum, default_value_t = Strategy::Fixed)]
    pub strategy: Strategy,

    /// Chunks of one document embedded concurrently
    #[arg(long, global = true, default_value_t = 1)]
    pub embed_concurrency: usize,

    /// Kind of source files to ingest
    #[arg(long, global = true, value_enum, default_value_t = InputFormat::Pdf)]
    pub input_format: InputFormat,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Fixed,
    Recursive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// PDF files via `pdftotext`
    Pdf,
    /// `.txt` and `.md` files
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Settings {
    /// Build and validate the pipeline configuration; `top_k` is the command's `k`.
    pub fn rag_config(&self, top_k: usize) -> pdf_rag::Result<RagConfig> {
        let strategy = match self.strategy {
            Strategy::Fixed => ChunkStrategy::Fixed,
            Strategy::Recursive => ChunkStrategy::Recursive,
        };
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(top_k)
            .chunk_strategy(strategy)
            .embed_concurrency(self.embed_concurrency)
            .build()
    }

    /// The Ollama base URL with a scheme, as `OLLAMA_HOST` is often `host:port`.
    pub fn ollama_base_url(&self) -> String {
        if self.ollama_url.contains("://") {
            self.ollama_url.clone()
        } else {
            format!("http://{}", self.ollama_url)
        }
    }

    pub fn embedder(&self) -> OllamaEmbeddingProvider {
        OllamaEmbeddingProvider::new(self.ollama_base_url())
            .with_model(self.embed_model.as_str())
            .with_dimensions(self.embed_dimensions)
    }

    pub fn generator(&self) -> OllamaGenerator {
        OllamaGenerator::new(self.ollama_base_url()).with_model(self.generate_model.as_str())
    }

    pub fn extractor(&self) -> Box<dyn TextExtractor> {
        match self.input_format {
            InputFormat::Pdf => Box::new(PdftotextExtractor::new()),
            InputFormat::Text => Box::new(PlainTextExtractor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_three_results() {
        let cli = Cli::try_parse_from(["pdf-rag", "query", "what is kharif?"]).unwrap();
        match cli.command {
            Command::Query { text, k, show_sources } => {
                assert_eq!(text, "what is kharif?");
                assert_eq!(k, 3);
                assert!(!show_sources);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.settings.chunk_size, 800);
        assert_eq!(cli.settings.chunk_overlap, 150);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "pdf-rag",
            "ingest",
            "docs",
            "--chunk-size",
            "400",
            "--strategy",
            "recursive",
            "--input-format",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.settings.chunk_size, 400);
        assert_eq!(cli.settings.strategy, Strategy::Recursive);
        assert_eq!(cli.settings.input_format, InputFormat::Text);
        assert!(matches!(
            cli.command,
            Command::Ingest { ref folder } if folder == &PathBuf::from("docs")
        ));
    }

    #[test]
    fn invalid_overlap_is_a_config_error() {
        let cli = Cli::try_parse_from([
            "pdf-rag",
            "chat",
            "--chunk-size",
            "10",
            "--chunk-overlap",
            "10",
        ])
        .unwrap();
        assert!(matches!(cli.settings.rag_config(3), Err(pdf_rag::RagError::ConfigError(_))));
    }

    #[test]
    fn bare_host_gets_http_scheme() {
        let mut cli = Cli::try_parse_from(["pdf-rag", "chat"]).unwrap();
        cli.settings.ollama_url = "127.0.0.1:11434".to_string();
        assert_eq!(cli.settings.ollama_base_url(), "http://127.0.0.1:11434");
        cli.settings.ollama_url = "https://ollama.internal".to_string();
        assert_eq!(cli.settings.ollama_base_url(), "https://ollama.internal");
    }
}
