//! Property tests for chunk boundaries.

use pdf_rag::{Chunker, RecursiveChunker, chunk_text};
use proptest::prelude::*;

/// A chunk size and an overlap strictly below it.
fn arb_size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Dropping each later chunk's overlap prefix and concatenating restores the text.
    #[test]
    fn fixed_chunks_reconstruct_text(
        text in "\\PC{0,200}",
        (size, overlap) in arb_size_and_overlap(),
    ) {
        let chunks = chunk_text(&text, size, overlap).unwrap();
        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(chunk);
            } else {
                rebuilt.extend(chunk.chars().skip(overlap));
            }
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn fixed_chunks_are_deterministic_and_bounded(
        text in "\\PC{0,200}",
        (size, overlap) in arb_size_and_overlap(),
    ) {
        let first = chunk_text(&text, size, overlap).unwrap();
        let second = chunk_text(&text, size, overlap).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.iter().all(|c| !c.is_empty() && c.chars().count() <= size));
        prop_assert_eq!(first.is_empty(), text.is_empty());
    }

    #[test]
    fn recursive_chunks_are_bounded_and_non_blank(
        text in "[a-z .!?\n]{0,300}",
        (size, overlap) in arb_size_and_overlap(),
    ) {
        let chunker = RecursiveChunker::new(size, overlap).unwrap();
        let chunks = chunker.split(&text);
        prop_assert!(chunks.iter().all(|c| !c.trim().is_empty() && c.chars().count() <= size));
        prop_assert_eq!(chunks, chunker.split(&text));
    }

    /// Every non-whitespace character of the input survives recursive chunking.
    #[test]
    fn recursive_chunks_cover_text(
        text in "[a-z .\n]{0,300}",
        size in 5usize..40,
    ) {
        let chunker = RecursiveChunker::new(size, 0).unwrap();
        let joined: String = chunker.split(&text).concat();
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        prop_assert_eq!(strip(&joined), strip(&text));
    }
}
