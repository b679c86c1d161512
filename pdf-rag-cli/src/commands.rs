//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use pdf_rag::{
    CancellationToken, IngestReport, RagError, RagPipeline, SearchResult, VectorIndex,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::args::{Cli, Command, Settings};

/// Run the parsed command to completion.
pub async fn execute(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let settings = cli.settings;
    match cli.command {
        Command::Ingest { folder } => ingest(&settings, &folder, &cancel).await,
        Command::Query { text, k, show_sources } => query(&settings, &text, k, show_sources).await,
        Command::RebuildIndex { folder } => {
            let folder = folder.unwrap_or_else(|| settings.docs_dir.clone());
            rebuild_index(&settings, &folder, &cancel).await
        }
        Command::Chat { k } => chat(&settings, k, &cancel).await,
    }
}

fn build_pipeline(settings: &Settings, top_k: usize, index: VectorIndex) -> Result<RagPipeline> {
    let pipeline = RagPipeline::builder()
        .config(settings.rag_config(top_k)?)
        .embedding_provider(Arc::new(settings.embedder()))
        .generator(Arc::new(settings.generator()))
        .index(Arc::new(index))
        .build()?;
    Ok(pipeline)
}

/// Load the persisted index, or start empty when none exists yet.
async fn load_or_empty(dir: &Path) -> Result<VectorIndex> {
    match VectorIndex::load(dir).await {
        Ok(index) => Ok(index),
        Err(RagError::NotFound(_)) => {
            info!(path = %dir.display(), "no persisted index, starting empty");
            Ok(VectorIndex::new())
        }
        Err(e) => Err(e).with_context(|| format!("loading index from {}", dir.display())),
    }
}

async fn ingest(settings: &Settings, folder: &Path, cancel: &CancellationToken) -> Result<()> {
    let index = load_or_empty(&settings.index_dir).await?;
    let pipeline = build_pipeline(settings, 1, index)?;
    let extractor = settings.extractor();

    let report = pipeline
        .ingest_folder(folder, extractor.as_ref(), cancel)
        .await
        .with_context(|| format!("ingesting {}", folder.display()))?;
    finish_ingestion(&pipeline, settings, report).await
}

async fn rebuild_index(
    settings: &Settings,
    folder: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let pipeline = build_pipeline(settings, 1, VectorIndex::new())?;
    let extractor = settings.extractor();

    let report = pipeline
        .rebuild(folder, extractor.as_ref(), cancel)
        .await
        .with_context(|| format!("rebuilding index from {}", folder.display()))?;
    finish_ingestion(&pipeline, settings, report).await
}

/// Print the report, persist what was ingested, and fail only if nothing was.
async fn finish_ingestion(
    pipeline: &RagPipeline,
    settings: &Settings,
    report: IngestReport,
) -> Result<()> {
    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.source, failure.error);
    }
    println!(
        "Ingested {} document(s), {} chunk(s); {} failed.",
        report.documents_ingested,
        report.chunks_added,
        report.failures.len()
    );

    if report.documents_ingested == 0 {
        if let Some(first) = report.failures.into_iter().next() {
            return Err(first.error)
                .with_context(|| format!("every document failed, first was {}", first.source));
        }
    }
    if pipeline.index().is_empty().await {
        warn!("no text was extracted; index not saved");
        return Ok(());
    }

    pipeline
        .index()
        .save(&settings.index_dir)
        .await
        .with_context(|| format!("saving index to {}", settings.index_dir.display()))?;
    println!("Index saved to {}", settings.index_dir.display());
    Ok(())
}

async fn query(settings: &Settings, text: &str, k: usize, show_sources: bool) -> Result<()> {
    let index = VectorIndex::load(&settings.index_dir)
        .await
        .with_context(|| format!("loading index from {}", settings.index_dir.display()))?;
    let pipeline = build_pipeline(settings, k, index)?;

    let answer = pipeline
        .answer_with_sources(text, k)
        .await
        .with_context(|| format!("query '{text}' failed"))?;
    println!("{}", answer.text);
    if show_sources {
        print_sources(&answer.sources);
    }
    Ok(())
}

async fn chat(settings: &Settings, k: usize, cancel: &CancellationToken) -> Result<()> {
    let index = match VectorIndex::load(&settings.index_dir).await {
        Ok(index) => index,
        Err(RagError::NotFound(_)) => {
            println!("No index found, building it from {}...", settings.docs_dir.display());
            rebuild_index(settings, &settings.docs_dir, cancel).await?;
            VectorIndex::load(&settings.index_dir).await.with_context(|| {
                format!("loading freshly built index from {}", settings.index_dir.display())
            })?
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("loading index from {}", settings.index_dir.display()));
        }
    };
    let pipeline = build_pipeline(settings, k, index)?;

    let mut editor = DefaultEditor::new()?;
    println!("Ready. Ask a question, or type 'exit' to quit.\n");

    loop {
        let line = match editor.readline("ask> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        let _ = editor.add_history_entry(question);

        match pipeline.answer_with_sources(question, k).await {
            Ok(answer) => println!("\n{}\n\n{}\n", answer.text, "-".repeat(50)),
            Err(e) => eprintln!("query '{question}' failed: {e}"),
        }
    }
    Ok(())
}

fn print_sources(sources: &[SearchResult]) {
    println!("\nSources:");
    for (i, result) in sources.iter().enumerate() {
        let preview: String = result.chunk.text.chars().take(80).collect();
        println!(
            "  {}. [score={:.4}] {} #{} | {}",
            i + 1,
            result.score,
            result.chunk.source,
            result.chunk.ordinal,
            preview.replace('\n', " ")
        );
    }
}
