//! Format-specific text extraction behind a closed variant type.
//!
//! Each supported format implements one `extract(bytes) -> text`
//! capability. Unknown extensions map to `None` and are skipped by the
//! ingestion batch; a failed extraction is reported per file and likewise
//! does not abort the batch.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// A document format docqa can ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Slides,
}

impl DocumentFormat {
    /// Map a file extension to a format. Unsupported extensions return
    /// `None`; the caller skips those files silently.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::PlainText),
            "pptx" => Some(Self::Slides),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "text",
            Self::Slides => "slides",
        }
    }

    /// Extract raw text from a document of this format.
    ///
    /// `name` is used only for error reporting.
    pub fn extract(self, name: &str, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Pdf => pdf_to_text(name, bytes),
            Self::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Self::Slides => slides_to_text(name, bytes),
        }
    }
}

/// Extract the text layer of a PDF from in-memory bytes.
///
/// Extraction quality varies by PDF (text layer vs scanned images); a
/// scanned document simply yields little or no text.
fn pdf_to_text(name: &str, bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Extract {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Extract visible text runs from a pptx slide deck.
///
/// A pptx file is a zip container; slide bodies live in
/// `ppt/slides/slideN.xml` with text inside `<a:t>` elements. Slides are
/// visited in numeric order and each contributes one block of lines.
fn slides_to_text(name: &str, bytes: &[u8]) -> Result<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| Error::Extract {
            name: name.to_string(),
            reason: format!("not a valid pptx container: {e}"),
        })?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(String::from)
        .collect();
    slide_names.sort_by_key(|n| slide_number(n));

    let mut text = String::new();
    for slide in &slide_names {
        let mut file =
            archive.by_name(slide).map_err(|e| Error::Extract {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let mut xml = String::new();
        file.read_to_string(&mut xml)?;
        extract_slide_runs(&xml, &mut text);
    }

    Ok(text)
}

/// Parse `ppt/slides/slideN.xml` → N, for ordering. Unparseable names sort last.
fn slide_number(name: &str) -> usize {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(usize::MAX)
}

/// Append the text content of every `<a:t>` element, one run per line.
fn extract_slide_runs(xml: &str, out: &mut String) {
    let mut reader = Reader::from_str(xml);
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"a:t" => {
                in_text_run = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"a:t" => {
                in_text_run = false;
                out.push('\n');
            }
            Ok(Event::Text(e)) if in_text_run => {
                if let Ok(run) = e.unescape() {
                    out.push_str(&run);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
}
