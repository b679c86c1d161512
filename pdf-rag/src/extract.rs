//! Text extraction from source files and folder discovery.
//!
//! PDF text comes from poppler's `pdftotext` binary, which must be on `PATH`.
//! Plain-text and markdown files are read as-is.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{RagError, Result, ServiceErrorKind};

/// Produces raw text for one source file.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// File extensions (lowercase, without the dot) this extractor handles.
    fn extensions(&self) -> &[&str];

    /// Extract the text of the file at `path`.
    ///
    /// Unreadable or scanned pages contribute no text, so the result may be
    /// empty. A missing file is [`RagError::NotFound`].
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Extracts PDF text with the `pdftotext` command-line tool.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: PathBuf,
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self { program: PathBuf::from("pdftotext") }
    }
}

impl PdftotextExtractor {
    /// Use `pdftotext` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftotext` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl TextExtractor for PdftotextExtractor {
    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        ensure_file(path).await?;

        let output = Command::new(&self.program)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| {
                let kind = if e.kind() == ErrorKind::NotFound {
                    ServiceErrorKind::ModelUnavailable
                } else {
                    ServiceErrorKind::Failed
                };
                RagError::service("pdftotext", kind, format!("{e} (is poppler installed?)"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(path = %path.display(), status = %output.status, "pdftotext failed");
            return Err(RagError::service(
                "pdftotext",
                ServiceErrorKind::Failed,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        // Form feeds separate pages.
        let text = String::from_utf8_lossy(&output.stdout).replace('\u{c}', "\n");
        if text.trim().is_empty() {
            warn!(path = %path.display(), "pdftotext extracted no text");
        } else {
            debug!(path = %path.display(), chars = text.chars().count(), "extracted pdf text");
        }
        Ok(text)
    }
}

/// Reads UTF-8 text files (`.txt`, `.md`) verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn extensions(&self) -> &[&str] {
        &["txt", "md"]
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RagError::NotFound(format!("document {}", path.display())))
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn ensure_file(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(RagError::NotFound(format!("{} is not a file", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(RagError::NotFound(format!("document {}", path.display())))
        }
        Err(e) => Err(e.into()),
    }
}

/// Recursively list files under `root` whose extension is in `extensions`, sorted.
///
/// # Errors
///
/// Returns [`RagError::NotFound`] if `root` does not exist or is not a directory.
pub fn discover_documents(root: impl AsRef<Path>, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(RagError::NotFound(format!("document folder {}", root.display())));
    }

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
                extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted))
            })
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

/// The source name recorded for `path`: its path relative to `root`, `/`-separated.
pub fn source_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_only_matching_extensions_sorted() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.pdf"), b"%PDF").unwrap();
        fs::write(root.join("nested/a.PDF"), b"%PDF").unwrap();
        fs::write(root.join("notes.txt"), "ignore").unwrap();

        let files = discover_documents(root, &["pdf"]).unwrap();
        let names: Vec<String> = files.iter().map(|p| source_name(root, p)).collect();
        assert_eq!(names, vec!["b.pdf", "nested/a.PDF"]);
    }

    #[test]
    fn missing_folder_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = discover_documents(temp.path().join("absent"), &["pdf"]).unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }

    #[tokio::test]
    async fn plain_text_reads_file_and_reports_missing() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        assert_eq!(PlainTextExtractor.extract(&path).await.unwrap(), "hello");

        let err = PlainTextExtractor.extract(&temp.path().join("b.txt")).await.unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }

    #[tokio::test]
    async fn pdftotext_missing_input_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = PdftotextExtractor::new()
            .extract(&temp.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
    }

    #[tokio::test]
    async fn absent_pdftotext_binary_is_model_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();
        let extractor =
            PdftotextExtractor::new().with_program(temp.path().join("no-such-pdftotext"));
        let err = extractor.extract(&path).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::ExternalService { kind: ServiceErrorKind::ModelUnavailable, .. }
        ));
    }
}
