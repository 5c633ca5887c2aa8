//! Chunking for the semantic path: fixed-size, overlapping windows.
//!
//! These character windows are independent of the lexical retriever's
//! line-based windows. Overlap keeps sentences that straddle a boundary
//! retrievable from at least one chunk.

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// A chunk of text from a larger document.
///
/// Produced by [`chunk_text`]. Each chunk is a window of the original
/// text, with an index and byte offset for mapping back.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The chunk text content.
    pub text: String,
    /// Zero-based chunk index within the document.
    pub index: usize,
    /// Byte offset where this chunk starts in the original document.
    pub start_offset: usize,
}

/// Split text into overlapping chunks.
///
/// If the text is shorter than `chunk_size`, returns a single chunk.
/// Window ends prefer word boundaries, and UTF-8 multi-byte characters
/// are never split.
///
/// # Examples
///
/// ```
/// use docqa::chunking::chunk_text;
///
/// let chunks = chunk_text("Hello, world!", 1000, 100);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text, "Hello, world!");
///
/// let text = "word ".repeat(500);
/// assert!(chunk_text(&text, 1000, 100).len() >= 2);
/// ```
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let char_count = text.chars().count();

    // Short text doesn't need chunking
    if char_count <= chunk_size {
        if text.trim().is_empty() {
            return Vec::new();
        }
        return vec![Chunk {
            text: text.to_string(),
            index: 0,
            start_offset: 0,
        }];
    }

    // Map of char index -> byte index for O(1) lookups
    let char_to_byte: Vec<usize> = text
        .char_indices()
        .map(|(byte_idx, _)| byte_idx)
        .chain(std::iter::once(text.len()))
        .collect();

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start_char = 0;
    let mut index = 0;

    while start_char < char_count {
        let end_char = (start_char + chunk_size).min(char_count);

        // Try to break at a word boundary
        let chunk_end_char = if end_char < char_count {
            find_word_boundary_char(text, &char_to_byte, end_char)
        } else {
            end_char
        };

        let start_byte = char_to_byte[start_char];
        let end_byte = char_to_byte[chunk_end_char];

        let chunk_text = &text[start_byte..end_byte];
        if !chunk_text.trim().is_empty() {
            chunks.push(Chunk {
                text: chunk_text.to_string(),
                index,
                start_offset: start_byte,
            });
            index += 1;
        }

        start_char += step;

        // Avoid creating a tiny final chunk
        if char_count.saturating_sub(start_char) < chunk_size / 4
            && !chunks.is_empty()
        {
            break;
        }
    }

    chunks
}

/// Find a word boundary near the given char position, preferring to break
/// at whitespace.
fn find_word_boundary_char(
    text: &str,
    char_to_byte: &[usize],
    pos_char: usize,
) -> usize {
    // Look back up to 100 chars for a good break point
    let search_start_char = pos_char.saturating_sub(100);

    let start_byte = char_to_byte[search_start_char];
    let end_byte = char_to_byte[pos_char];
    let search_region = &text[start_byte..end_byte];

    if let Some(ws_byte_offset) =
        search_region.rfind(|c: char| c.is_whitespace())
    {
        let ws_byte = start_byte + ws_byte_offset;
        for (char_idx, &byte_idx) in char_to_byte.iter().enumerate() {
            if byte_idx > ws_byte {
                return char_idx;
            }
        }
    }

    pos_char
}
