//! Context assembly and prompt construction.

use crate::document::SearchResult;

/// Separator placed between chunk texts in the assembled context.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join the chunk texts of `results` in the given order, separated by a blank line.
///
/// An empty result set yields an empty string.
pub fn assemble(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CHUNK_SEPARATOR)
}

/// Fill `{context}` and `{question}` in `template`.
///
/// The context is substituted after the question placeholder is located, so
/// a chunk that happens to contain the text `{question}` is left untouched.
pub fn render_prompt(template: &str, context: &str, question: &str) -> String {
    template
        .split("{context}")
        .map(|part| part.replace("{question}", question))
        .collect::<Vec<_>>()
        .join(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROMPT_TEMPLATE;
    use crate::document::Chunk;

    fn result(ordinal: usize, text: &str, score: f32) -> SearchResult {
        SearchResult { chunk: Chunk::new("doc.pdf", ordinal, text), score }
    }

    #[test]
    fn empty_results_assemble_to_empty_string() {
        assert_eq!(assemble(&[]), "");
    }

    #[test]
    fn keeps_ranked_order_with_blank_line_separator() {
        let results = [result(3, "best", 0.9), result(0, "second", 0.5)];
        assert_eq!(assemble(&results), "best\n\nsecond");
    }

    #[test]
    fn default_template_renders_both_sections() {
        let prompt = render_prompt(DEFAULT_PROMPT_TEMPLATE, "ctx", "why?");
        assert_eq!(
            prompt,
            "Use the following context to answer the question.\n\nContext:\nctx\n\nQuestion:\nwhy?\n\nAnswer:"
        );
    }

    #[test]
    fn placeholders_inside_context_are_not_expanded() {
        let prompt = render_prompt("{context}|{question}", "see {question}", "q");
        assert_eq!(prompt, "see {question}|q");
    }
}
