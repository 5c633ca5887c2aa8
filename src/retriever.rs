//! Relevance retrieval strategies.
//!
//! All strategies implement [`Retriever`], so answer synthesis never
//! cares which one produced the context. Empty retrieved context means
//! "no direct answer found", never an error.

use crate::{
    embedding::Embedder,
    error::Result,
    text_util::{is_heading, similarity_ratio},
    vector_index::VectorIndex,
};

/// Default number of windows returned by the lexical retriever.
pub const DEFAULT_MAX_CHUNKS: usize = 5;

/// Default lexical window size in lines.
pub const DEFAULT_WINDOW: usize = 40;

/// Default number of chunks returned by the semantic retriever.
pub const DEFAULT_TOP_K: usize = 5;

/// A retrieval strategy: question in, context text out.
pub trait Retriever {
    fn retrieve(&self, question: &str) -> Result<String>;
}

/// Scores every line against the question with an edit-distance ratio
/// and returns the top non-overlapping windows of surrounding lines.
pub struct LexicalRetriever<'a> {
    pub lines: &'a [String],
    pub max_chunks: usize,
    pub window: usize,
}

impl<'a> LexicalRetriever<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        Self {
            lines,
            max_chunks: DEFAULT_MAX_CHUNKS,
            window: DEFAULT_WINDOW,
        }
    }
}

impl Retriever for LexicalRetriever<'_> {
    fn retrieve(&self, question: &str) -> Result<String> {
        Ok(find_relevant_windows(
            question,
            self.lines,
            self.max_chunks,
            self.window,
        ))
    }
}

/// Returns the span of lines following the best-matching line, up to the
/// next heading.
pub struct HeadingBoundedRetriever<'a> {
    pub lines: &'a [String],
}

impl Retriever for HeadingBoundedRetriever<'_> {
    fn retrieve(&self, question: &str) -> Result<String> {
        Ok(heading_bounded_span(question, self.lines).join("\n"))
    }
}

/// Nearest-neighbor lookup against a built [`VectorIndex`].
pub struct SemanticRetriever<'a> {
    pub index: &'a VectorIndex,
    pub embedder: &'a dyn Embedder,
    pub top_k: usize,
}

impl Retriever for SemanticRetriever<'_> {
    fn retrieve(&self, question: &str) -> Result<String> {
        let results = self.index.query(question, self.top_k, self.embedder)?;
        Ok(results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Rank lines by similarity to the question and emit the top
/// `max_chunks` windows of `window` consecutive lines each.
///
/// Windows are emitted in score-descending order. Once a window is
/// emitted, its whole line range is consumed; a later candidate whose
/// start falls inside a consumed range is skipped, so no two returned
/// windows overlap.
pub fn find_relevant_windows(
    question: &str,
    lines: &[String],
    max_chunks: usize,
    window: usize,
) -> String {
    if lines.is_empty() || max_chunks == 0 || window == 0 {
        return String::new();
    }

    let mut ranked: Vec<(usize, f32)> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i, similarity_ratio(question, line)))
        .collect();

    // Stable sort: descending score, ties keep index order.
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut consumed = vec![false; lines.len()];
    let mut windows = Vec::new();

    for &(start, _) in ranked.iter().take(max_chunks) {
        if consumed[start] {
            continue;
        }
        let end = (start + window).min(lines.len());
        windows.push(lines[start..end].join("\n"));
        for flag in &mut consumed[start..end] {
            *flag = true;
        }
    }

    windows.join("\n\n")
}

/// Find the line most similar to the question, then collect it and the
/// following lines until a heading-like line or the end of the sequence.
///
/// The heading itself is excluded. If nothing follows the best match
/// before a heading (in particular, if it is the last line), the result
/// is empty and callers render "no direct answer found".
pub fn heading_bounded_span(question: &str, lines: &[String]) -> Vec<String> {
    let Some(best) = best_match_index(question, lines) else {
        return Vec::new();
    };

    let mut span = Vec::new();
    for line in &lines[best + 1..] {
        if is_heading(line) {
            break;
        }
        span.push(line.clone());
    }

    if span.is_empty() {
        return Vec::new();
    }
    span.insert(0, lines[best].clone());
    span
}

/// Index of the highest-scoring line; first occurrence wins on ties.
fn best_match_index(question: &str, lines: &[String]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, line) in lines.iter().enumerate() {
        let score = similarity_ratio(question, line);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn lexical_empty_lines_return_empty_text() {
        let text = find_relevant_windows("any question", &[], 5, 40);
        assert!(text.is_empty());
    }

    #[test]
    fn lexical_best_line_leads_its_window() {
        let corpus = lines(&[
            "Gardening requires patience.",
            "Machine learning uses data.",
            "It predicts outcomes.",
            "Cooking pasta is easy.",
        ]);
        let text = find_relevant_windows(
            "What does machine learning use?",
            &corpus,
            1,
            2,
        );
        assert_eq!(
            text,
            "Machine learning uses data.\nIt predicts outcomes."
        );
    }

    #[test]
    fn lexical_windows_never_overlap() {
        // Many near-identical lines: all candidates cluster together, so
        // after the first window consumes its range the rest are skipped.
        let corpus = lines(&[
            "machine learning a", "machine learning b", "machine learning c",
            "machine learning d", "machine learning e", "machine learning f",
        ]);
        let text =
            find_relevant_windows("machine learning", &corpus, 5, 4);

        let mut seen = std::collections::HashSet::new();
        for window in text.split("\n\n") {
            for line in window.lines() {
                assert!(seen.insert(line.to_string()), "line {line} repeated");
            }
        }
    }

    #[test]
    fn lexical_respects_max_chunks() {
        let corpus: Vec<String> =
            (0..100).map(|i| format!("filler line number {i}")).collect();
        let text = find_relevant_windows("filler", &corpus, 3, 1);
        assert!(text.split("\n\n").count() <= 3);
    }

    #[test]
    fn lexical_window_truncates_at_end_of_sequence() {
        let corpus = lines(&["only line matching question"]);
        let text =
            find_relevant_windows("matching question", &corpus, 5, 40);
        assert_eq!(text, "only line matching question");
    }

    #[test]
    fn heading_bounded_scenario() {
        let corpus = lines(&[
            "Introduction",
            "Machine learning uses data.",
            "It predicts outcomes.",
            "Conclusion",
            "Summary text.",
        ]);
        let span =
            heading_bounded_span("What does machine learning use?", &corpus);
        assert_eq!(
            span,
            vec!["Machine learning uses data.", "It predicts outcomes."],
        );
    }

    #[test]
    fn heading_bounded_stops_at_heading() {
        let corpus = lines(&[
            "overview of the topic",
            "the pasta recipe needs water",
            "add salt generously",
            "Next Section Heading",
            "unrelated content",
        ]);
        let span = heading_bounded_span("pasta recipe water", &corpus);
        assert_eq!(
            span,
            vec!["the pasta recipe needs water", "add salt generously"]
        );
    }

    #[test]
    fn heading_bounded_best_match_at_end_is_empty() {
        let corpus = lines(&["irrelevant filler", "machine learning topic"]);
        let span = heading_bounded_span("machine learning topic", &corpus);
        assert!(span.is_empty());
    }

    #[test]
    fn heading_bounded_empty_lines() {
        assert!(heading_bounded_span("question", &[]).is_empty());
    }

    #[test]
    fn heading_bounded_runs_to_end_without_heading() {
        let corpus = lines(&[
            "the question topic here",
            "first following line",
            "second following line",
        ]);
        let span = heading_bounded_span("the question topic here", &corpus);
        assert_eq!(
            span,
            vec![
                "the question topic here",
                "first following line",
                "second following line"
            ]
        );
    }

    #[test]
    fn retriever_trait_objects_are_interchangeable() {
        let corpus = lines(&["machine learning uses data"]);
        let lexical = LexicalRetriever::new(&corpus);
        let heading = HeadingBoundedRetriever { lines: &corpus };

        let retrievers: Vec<&dyn Retriever> = vec![&lexical, &heading];
        for r in retrievers {
            // Both succeed; content differs by strategy.
            r.retrieve("machine learning").unwrap();
        }
    }
}
