//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: overlapping fixed-size character windows
//! - [`RecursiveChunker`]: splits at paragraph, line, sentence, then word
//!   boundaries and merges the pieces back up to the chunk size
//!
//! All sizes are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::{ChunkStrategy, RagConfig, validate_chunking};
use crate::document::{Chunk, Document};
use crate::error::Result;

/// A strategy for splitting documents into chunks.
///
/// Implementations only decide chunk boundaries; ordinals and identifiers are
/// assigned by [`chunk`](Chunker::chunk).
pub trait Chunker: Send + Sync {
    /// Split text into ordered, non-empty chunk texts.
    ///
    /// Returns an empty `Vec` for empty text. Pure: the same input always
    /// yields the same output.
    fn split(&self, text: &str) -> Vec<String>;

    /// Split a document into [`Chunk`]s with ordinals and derived identifiers.
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk::new(document.source.as_str(), ordinal, text))
            .collect()
    }
}

/// Build the chunker selected by `config.chunk_strategy`.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) for an
/// invalid size/overlap pair.
pub fn chunker_for(config: &RagConfig) -> Result<Arc<dyn Chunker>> {
    Ok(match config.chunk_strategy {
        ChunkStrategy::Fixed => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
        ChunkStrategy::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
    })
}

/// Split `text` into windows of `chunk_size` characters advancing by
/// `chunk_size - chunk_overlap`.
///
/// The walk stops once a window reaches the end of the text, so a trailing
/// window lying entirely inside the previous one's overlap is never emitted.
/// A short final window (even a single character) is kept.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if
/// `chunk_size == 0` or `chunk_overlap >= chunk_size`.
///
/// # Example
///
/// ```rust
/// let chunks = pdf_rag::chunk_text("ABCDEFGHIJ", 4, 1)?;
/// assert_eq!(chunks, ["ABCD", "DEFG", "GHIJ"]);
/// # Ok::<(), pdf_rag::RagError>(())
/// ```
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    validate_chunking(chunk_size, chunk_overlap)?;
    Ok(split_by_size(text, chunk_size, chunk_overlap))
}

fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let offsets: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = offsets.len() - 1;
    let step = chunk_size - chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[offsets[start]..offsets[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }
    chunks
}

/// Splits text into fixed-size character windows with configurable overlap.
///
/// # Example
///
/// ```rust
/// use pdf_rag::{Chunker, Document, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1)?;
/// let chunks = chunker.chunk(&Document::new("letters.pdf", "ABCDEFGHIJ"));
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[2].ordinal, 2);
/// # Ok::<(), pdf_rag::RagError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Fails fast with a configuration error unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_by_size(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Boundaries tried in order, coarsest first.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "? ", "! ", " "];

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Pieces are merged greedily up to `chunk_size`; when a chunk is emitted, its
/// trailing pieces totalling at most `chunk_overlap` characters seed the next
/// one. A piece longer than `chunk_size` is split with the next separator,
/// ending with fixed windows. Whitespace-only chunks are dropped.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Fails fast with a configuration error unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some((separator, rest)) = separators.split_first() else {
            return split_by_size(text, self.chunk_size, self.chunk_overlap);
        };

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut window_len = 0;

        for piece in split_keeping_separator(text, separator) {
            let piece_len = char_len(piece);
            if piece_len > self.chunk_size {
                if !window.is_empty() {
                    chunks.push(window.drain(..).collect::<String>());
                    window_len = 0;
                }
                chunks.extend(self.split_with(piece, rest));
                continue;
            }

            if !window.is_empty() && window_len + piece_len > self.chunk_size {
                chunks.push(window.iter().copied().collect::<String>());
                while window_len > self.chunk_overlap || window_len + piece_len > self.chunk_size {
                    let Some(front) = window.pop_front() else { break };
                    window_len -= char_len(front);
                }
            }
            window.push_back(piece);
            window_len += piece_len;
        }

        if !window.is_empty() {
            chunks.push(window.into_iter().collect::<String>());
        }
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_with(text, &SEPARATORS)
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text at a separator while keeping the separator attached to the preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    #[test]
    fn fixed_windows_match_reference_scenario() {
        let chunks = chunk_text("ABCDEFGHIJ", 4, 1).unwrap();
        assert_eq!(chunks, vec!["ABCD", "DEFG", "GHIJ"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 4, 1).unwrap().is_empty());
        assert!(RecursiveChunker::new(4, 1).unwrap().split("").is_empty());
    }

    #[test]
    fn single_character_tail_is_kept() {
        let chunks = chunk_text("ABCDE", 4, 0).unwrap();
        assert_eq!(chunks, vec!["ABCD", "E"]);
    }

    #[test]
    fn overlap_equal_to_size_is_rejected() {
        assert!(matches!(chunk_text("abc", 3, 3), Err(RagError::ConfigError(_))));
        assert!(matches!(chunk_text("abc", 0, 0), Err(RagError::ConfigError(_))));
        assert!(FixedSizeChunker::new(2, 5).is_err());
    }

    #[test]
    fn windows_count_characters_not_bytes() {
        let chunks = chunk_text("äöüß€", 2, 0).unwrap();
        assert_eq!(chunks, vec!["äö", "üß", "€"]);
    }

    #[test]
    fn chunk_assigns_ordinals_and_source() {
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk(&Document::new("a.pdf", "ABCDEFGHIJ"));
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert!(chunks.iter().all(|c| c.source == "a.pdf"));
        assert_eq!(chunks[1].id, crate::document::chunk_id("a.pdf", 1));
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(20, 0).unwrap();
        let chunks = chunker.split("first paragraph\n\nsecond paragraph");
        assert_eq!(chunks, vec!["first paragraph\n\n", "second paragraph"]);
    }

    #[test]
    fn recursive_respects_size_and_carries_overlap() {
        let chunker = RecursiveChunker::new(12, 4).unwrap();
        let chunks = chunker.split("one two three four five six seven");
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert!(chunks.len() > 1);
        // The second chunk starts with the tail word of the first.
        let first_tail = chunks[0].split_whitespace().last().unwrap();
        assert!(chunks[1].starts_with(first_tail));
    }

    #[test]
    fn recursive_falls_back_to_fixed_windows_for_long_words() {
        let chunker = RecursiveChunker::new(4, 0).unwrap();
        assert_eq!(chunker.split("abcdefghij"), vec!["abcd", "efgh", "ij"]);
    }
}
