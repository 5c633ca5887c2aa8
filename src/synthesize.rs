//! Answer assembly from retrieved context.
//!
//! Two sub-strategies: extract matching sentences into a bounded point
//! list (with a configurable canned fallback when nothing matches), or
//! stuff the context into a prompt template for a generative model.

use crate::text_util::{keywords, split_sentences};

/// Upper bound on points in a synthesized answer.
pub const MAX_POINTS: usize = 6;

/// A relevant sentence must be longer than this after trimming.
const MIN_SENTENCE_LEN: usize = 10;

/// Built-in fallback points, used when no configured set exists.
///
/// These are a safety net, not part of the synthesis contract; swap them
/// per domain with `docqa fallback set`.
pub const DEFAULT_FALLBACK_POINTS: &[&str] = &[
    "Learning from Data: Unlike traditional programs with hardcoded rules, \
     ML learns patterns and relationships directly from data.",
    "Automation of Decisions: ML can automatically make predictions or \
     decisions, saving time and reducing errors.",
    "Supervised Learning: Algorithms can learn from input-output pairs to \
     predict outcomes for new data.",
    "Generalization: ML models can handle unseen data to make robust \
     predictions.",
    "Feature Importance: ML identifies which features are most influential, \
     improving decision-making.",
    "Scalability & Improvement: ML handles large datasets efficiently and \
     can improve as more data becomes available.",
];

/// Prompt template for the generative path; `{context}` and `{question}`
/// are interpolated.
const PROMPT_TEMPLATE: &str = "\
Answer the question as thoroughly as possible using the context below.
If the answer is not present, generate the most reasonable answer based on the documents.

Context:
{context}

Question:
{question}

Answer:
";

/// Extract up to [`MAX_POINTS`] question-relevant sentences from the
/// context, in their order of appearance.
///
/// A sentence is relevant when it contains any question keyword
/// (case-insensitive) and is longer than 10 characters after trimming.
/// The question itself never appears as a point. When nothing matches,
/// the first [`MAX_POINTS`] entries of `fallback` are returned instead.
pub fn synthesize_points(
    question: &str,
    context: &str,
    fallback: &[String],
) -> Vec<String> {
    let kws = keywords(question);
    let question_trimmed = question.trim();

    let relevant: Vec<String> = split_sentences(context)
        .into_iter()
        .filter(|s| s.len() > MIN_SENTENCE_LEN)
        .filter(|s| !s.eq_ignore_ascii_case(question_trimmed))
        .filter(|s| {
            let lower = s.to_lowercase();
            kws.iter().any(|kw| lower.contains(kw.as_str()))
        })
        .take(MAX_POINTS)
        .map(str::to_string)
        .collect();

    if !relevant.is_empty() {
        return relevant;
    }

    fallback
        .iter()
        .filter(|p| !p.trim().eq_ignore_ascii_case(question_trimmed))
        .take(MAX_POINTS)
        .cloned()
        .collect()
}

/// Format points as a numbered list, one per line.
pub fn format_points(points: &[String]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interpolate retrieved context and the question into the fixed prompt
/// template for the generative path.
pub fn stuff_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// The compiled-in fallback set as owned strings.
pub fn default_fallback() -> Vec<String> {
    DEFAULT_FALLBACK_POINTS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_sentences_containing_keywords() {
        let context = "Machine learning uses data. The weather is nice. \
                       Learning improves predictions over time.";
        let points = synthesize_points(
            "What does machine learning use?",
            context,
            &default_fallback(),
        );
        assert_eq!(
            points,
            vec![
                "Machine learning uses data.",
                "Learning improves predictions over time."
            ]
        );
    }

    #[test]
    fn points_keep_context_order() {
        let context = "Zebras relate to learning somehow. \
                       Apples relate to learning too.";
        let points =
            synthesize_points("learning topics", context, &default_fallback());
        assert!(points[0].starts_with("Zebras"));
        assert!(points[1].starts_with("Apples"));
    }

    #[test]
    fn never_more_than_six_points() {
        let context = "Learning sentence number one here. "
            .repeat(20)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        // 20 relevant sentences, all containing "learning"
        let context = format!("{context}.");
        let points =
            synthesize_points("learning", &context, &default_fallback());
        assert!(points.len() <= MAX_POINTS);
    }

    #[test]
    fn empty_context_yields_fallback() {
        let points =
            synthesize_points("any question at all", "", &default_fallback());
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], DEFAULT_FALLBACK_POINTS[0]);
    }

    #[test]
    fn no_keyword_match_yields_fallback() {
        let context = "Completely unrelated text about gardening.";
        let points = synthesize_points(
            "quantum chromodynamics",
            context,
            &default_fallback(),
        );
        assert_eq!(points.len(), 6);
    }

    #[test]
    fn custom_fallback_is_respected() {
        let fallback = vec!["Only point.".to_string()];
        let points = synthesize_points("no match here", "", &fallback);
        assert_eq!(points, vec!["Only point."]);
    }

    #[test]
    fn fallback_is_capped_at_six() {
        let fallback: Vec<String> =
            (0..10).map(|i| format!("Fallback point {i}")).collect();
        let points = synthesize_points("zzz", "", &fallback);
        assert_eq!(points.len(), 6);
    }

    #[test]
    fn question_is_never_echoed_as_point() {
        let question = "What does machine learning use?";
        let context = "What does machine learning use? \
                       Machine learning uses data.";
        let points =
            synthesize_points(question, context, &default_fallback());
        assert!(points.iter().all(|p| !p.eq_ignore_ascii_case(question)));
        assert!(points.contains(&"Machine learning uses data.".to_string()));
    }

    #[test]
    fn short_sentences_are_ignored() {
        let context = "Learning. Machine learning uses lots of data.";
        let points =
            synthesize_points("learning", context, &default_fallback());
        assert_eq!(points, vec!["Machine learning uses lots of data."]);
    }

    #[test]
    fn format_is_a_numbered_list() {
        let formatted = format_points(&[
            "First point".to_string(),
            "Second point".to_string(),
        ]);
        assert_eq!(formatted, "1. First point\n2. Second point");
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = stuff_prompt("CONTEXT BLOCK", "QUESTION TEXT");
        assert!(prompt.contains("CONTEXT BLOCK"));
        assert!(prompt.contains("QUESTION TEXT"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }
}
