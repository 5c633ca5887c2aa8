//! Document normalization: raw extracted text into clean, addressable lines.
//!
//! Every retrieval strategy operates on the ordered line sequence produced
//! here. Page numbers, table-of-contents rows and likely tabular data are
//! dropped; ordinal prefixes ("1.", "2)") are stripped; boilerplate
//! sections (index/glossary/references) terminate processing according to
//! the configured [`StopSectionPolicy`].

/// Section markers that end the useful part of a document.
const STOP_MARKERS: &[&str] = &["index", "glossary", "references"];

/// What to do when a stop-section marker line is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopSectionPolicy {
    /// Discard the marker and everything after it in the same document.
    ///
    /// This mirrors the historical behavior. It over-discards when a
    /// marker appears mid-document (an "Index" slide in the middle of a
    /// deck), which is why [`StopSectionPolicy::DropMarkerOnly`] exists.
    #[default]
    TruncateRemainder,
    /// Drop only the marker line itself and keep processing.
    DropMarkerOnly,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub stop_policy: StopSectionPolicy,
}

/// Normalize one document's raw text into an ordered sequence of lines.
///
/// An empty result means "no usable document"; callers answer accordingly
/// rather than treating it as an error.
///
/// # Examples
///
/// ```
/// use docqa::normalize::{normalize, NormalizeOptions};
///
/// let lines = normalize("1. Intro\n42\nBody text\n", &NormalizeOptions::default());
/// assert_eq!(lines, vec!["Intro", "Body text"]);
/// ```
pub fn normalize(text: &str, options: &NormalizeOptions) -> Vec<String> {
    let mut lines = Vec::new();

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_stop_marker(trimmed) {
            match options.stop_policy {
                StopSectionPolicy::TruncateRemainder => break,
                StopSectionPolicy::DropMarkerOnly => continue,
            }
        }

        if is_numeric_line(trimmed)
            || is_toc_row(trimmed)
            || is_data_row(trimmed)
        {
            continue;
        }

        let stripped = strip_ordinal_prefix(trimmed).trim();
        if stripped.is_empty() {
            continue;
        }

        lines.push(stripped.to_string());
    }

    lines
}

/// Normalize a batch of documents, concatenating surviving lines in
/// document order. Stop-section truncation is scoped per document.
pub fn normalize_batch(texts: &[String], options: &NormalizeOptions) -> Vec<String> {
    let mut all = Vec::new();
    for text in texts {
        all.extend(normalize(text, options));
    }
    all
}

fn is_stop_marker(line: &str) -> bool {
    STOP_MARKERS.iter().any(|m| line.eq_ignore_ascii_case(m))
}

/// Purely numeric lines are page numbers.
fn is_numeric_line(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

/// Table-of-contents rows end in a pipe followed by a number.
fn is_toc_row(line: &str) -> bool {
    let Some(pos) = line.rfind('|') else {
        return false;
    };
    let tail = line[pos + 1..].trim();
    !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit())
}

/// Comma-heavy lines containing digits are likely tabular data.
fn is_data_row(line: &str) -> bool {
    line.matches(',').count() >= 2 && line.chars().any(|c| c.is_ascii_digit())
}

/// Strip a leading ordinal marker: digits followed by `.`, `)` or `-` and
/// optional whitespace.
fn strip_ordinal_prefix(line: &str) -> &str {
    let digits_end = line
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(line.len());

    if digits_end == 0 {
        return line;
    }

    let rest = &line[digits_end..];
    match rest.chars().next() {
        Some('.' | ')' | '-') => rest[1..].trim_start(),
        _ => line,
    }
}
