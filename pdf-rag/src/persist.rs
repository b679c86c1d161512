//! On-disk format for [`VectorIndex`](crate::VectorIndex).
//!
//! An index directory holds two files:
//!
//! - `entries.json`: array of `{id, text, source, ordinal, vector}`
//! - `manifest.json`: format version, dimensionality, entry count, and the
//!   SHA-256 of `entries.json`
//!
//! Both are written to a temporary name and renamed into place, entries first,
//! so a reader never pairs a new manifest with a half-written payload.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::document::EmbeddedChunk;
use crate::error::{RagError, Result};

pub(crate) const MANIFEST_FILE: &str = "manifest.json";
pub(crate) const ENTRIES_FILE: &str = "entries.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    dimensions: usize,
    entry_count: usize,
    checksum: String,
}

pub(crate) async fn write_bundle(
    dir: &Path,
    dimensions: usize,
    entries: &[&EmbeddedChunk],
) -> Result<()> {
    fs::create_dir_all(dir).await?;

    let payload = serde_json::to_vec(entries).map_err(std::io::Error::other)?;
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        dimensions,
        entry_count: entries.len(),
        checksum: sha256_hex(&payload),
    };
    let manifest = serde_json::to_vec_pretty(&manifest).map_err(std::io::Error::other)?;

    write_atomic(&dir.join(ENTRIES_FILE), &payload).await?;
    write_atomic(&dir.join(MANIFEST_FILE), &manifest).await?;
    Ok(())
}

pub(crate) async fn read_bundle(dir: &Path) -> Result<(usize, Vec<EmbeddedChunk>)> {
    let manifest_bytes = read_or_not_found(dir, MANIFEST_FILE).await?;
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| corrupt(dir, format!("unreadable manifest: {e}")))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(corrupt(
            dir,
            format!("unsupported format version {}", manifest.format_version),
        ));
    }
    if manifest.dimensions == 0 {
        return Err(corrupt(dir, "dimensionality is zero"));
    }
    if manifest.entry_count == 0 {
        return Err(corrupt(dir, "index has no entries"));
    }

    let payload = match fs::read(dir.join(ENTRIES_FILE)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(corrupt(dir, format!("{ENTRIES_FILE} is missing")));
        }
        Err(e) => return Err(e.into()),
    };
    if sha256_hex(&payload) != manifest.checksum {
        return Err(corrupt(dir, "checksum mismatch"));
    }

    let entries: Vec<EmbeddedChunk> = serde_json::from_slice(&payload)
        .map_err(|e| corrupt(dir, format!("unreadable entries: {e}")))?;
    if entries.len() != manifest.entry_count {
        return Err(corrupt(
            dir,
            format!("expected {} entries, found {}", manifest.entry_count, entries.len()),
        ));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if entry.vector.len() != manifest.dimensions {
            return Err(corrupt(
                dir,
                format!(
                    "entry '{}' has {} dimensions, expected {}",
                    entry.chunk.id,
                    entry.vector.len(),
                    manifest.dimensions
                ),
            ));
        }
        if !entry.vector.iter().all(|v| v.is_finite()) {
            return Err(corrupt(dir, format!("entry '{}' has non-finite values", entry.chunk.id)));
        }
        if !seen.insert(entry.chunk.id.as_str()) {
            return Err(corrupt(dir, format!("duplicate entry id '{}'", entry.chunk.id)));
        }
    }

    Ok((manifest.dimensions, entries))
}

async fn read_or_not_found(dir: &Path, file: &str) -> Result<Vec<u8>> {
    match fs::read(dir.join(file)).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(RagError::NotFound(format!("no persisted index at {}", dir.display())))
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = PathBuf::from(path);
    tmp.set_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn corrupt(dir: &Path, reason: impl Into<String>) -> RagError {
    RagError::CorruptIndex { path: dir.to_path_buf(), reason: reason.into() }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
