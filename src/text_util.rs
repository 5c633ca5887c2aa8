//! Small text heuristics shared by the retrievers and the synthesizer.

/// Minimum share of capitalized words for a line to count as a heading.
const HEADING_UPPERCASE_SHARE: f32 = 0.7;

/// Question words must be longer than this to count as keywords.
const MIN_KEYWORD_LEN: usize = 3;

/// Case-insensitive string similarity in `[0, 1]`.
///
/// Computed as `1 - edit_distance / max_len` over the lowercased inputs.
/// Identical strings score 1.0, fully dissimilar strings approach 0.0.
///
/// # Examples
///
/// ```
/// use docqa::text_util::similarity_ratio;
///
/// assert_eq!(similarity_ratio("hello", "HELLO"), 1.0);
/// assert_eq!(similarity_ratio("", ""), 1.0);
/// assert!(similarity_ratio("kitten", "sitting") > 0.5);
/// ```
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }

    let dist = edit_distance(&a, &b);
    1.0 - (dist as f32 / max_len as f32)
}

/// Levenshtein distance between two char sequences (two-row DP).
fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost)
                .min(prev[j + 1] + 1)
                .min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Whether a line looks like a section heading.
///
/// A heading has at most 10 words and at least 70% of them start with an
/// uppercase letter. Single capitalized words ("Introduction",
/// "Conclusion") count.
///
/// # Examples
///
/// ```
/// use docqa::text_util::is_heading;
///
/// assert!(is_heading("Machine Learning Basics"));
/// assert!(is_heading("Conclusion"));
/// assert!(!is_heading("the quick brown fox jumps over"));
/// ```
pub fn is_heading(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() || words.len() > 10 {
        return false;
    }

    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();

    capitalized as f32 / words.len() as f32 >= HEADING_UPPERCASE_SHARE
}

/// Split text into sentences at `.`, `!` or `?` followed by whitespace.
///
/// The terminating punctuation stays with its sentence. A trailing
/// fragment without terminal punctuation is returned as-is.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_was_terminal = false;

    for (idx, c) in text.char_indices() {
        if prev_was_terminal && c.is_whitespace() {
            let sentence = text[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = idx;
        }
        prev_was_terminal = matches!(c, '.' | '!' | '?');
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Extract lowercased keywords from a question: words longer than 3 chars.
pub fn keywords(question: &str) -> Vec<String> {
    question
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_LEN)
        .map(|w| w.to_lowercase())
        .collect()
}
