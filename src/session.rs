//! A question-answering session over an ingested document batch.
//!
//! The session owns the normalized line sequence, the persisted semantic
//! index handle, and a flat in-memory transcript. Ingestion replaces the
//! corpus wholesale and rebuilds the index; there are no incremental
//! updates.

use std::path::{Path, PathBuf};

use crate::{
    chunking::{chunk_text, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    embedding::{Embedder, HashEmbedder},
    error::{Error, Result},
    extract::DocumentFormat,
    generate::Generator,
    normalize::{normalize_batch, NormalizeOptions},
    retriever::{
        HeadingBoundedRetriever, LexicalRetriever, Retriever,
        SemanticRetriever, DEFAULT_MAX_CHUNKS, DEFAULT_TOP_K, DEFAULT_WINDOW,
    },
    synthesize::{default_fallback, format_points, stuff_prompt,
        synthesize_points},
    vector_index::VectorIndex,
};

/// Which retrieval family answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Edit-distance line scoring with surrounding windows.
    Lexical,
    /// Span after the best-matching line, bounded by the next heading.
    Heading,
    /// Nearest-neighbor lookup in the persisted vector index.
    Semantic,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Heading => "heading",
            Self::Semantic => "semantic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "lexical" => Some(Self::Lexical),
            "heading" => Some(Self::Heading),
            "semantic" => Some(Self::Semantic),
            _ => None,
        }
    }

    /// Pick the strategy for a question: an explicit flag wins, then the
    /// stored default setting, then lexical.
    pub fn resolve(
        explicit: Option<Self>,
        stored: Option<&str>,
    ) -> Result<Self> {
        if let Some(strategy) = explicit {
            return Ok(strategy);
        }
        match stored {
            None => Ok(Self::Lexical),
            Some(name) => Self::from_name(name).ok_or_else(|| {
                Error::Config(format!(
                    "stored default strategy '{name}' is not one of \
                     lexical, heading, semantic"
                ))
            }),
        }
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub question: String,
    pub answer: String,
}

/// Outcome of [`Session::ingest`].
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Files whose text made it into the corpus.
    pub ingested: Vec<String>,
    /// Files skipped (unsupported extension or failed extraction).
    pub skipped: Vec<String>,
    /// Normalized line count after the batch.
    pub line_count: usize,
    /// Chunks stored in the rebuilt semantic index.
    pub chunk_count: usize,
}

/// A synthesized answer, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Numbered extractive points.
    Points(Vec<String>),
    /// A contiguous passage (heading-bounded strategy).
    Passage(String),
    /// Text produced by a generative model.
    Generated(String),
    /// Nothing to answer from; carries the user-facing reason.
    Empty(&'static str),
}

impl Answer {
    pub fn render(&self) -> String {
        match self {
            Answer::Points(points) => format_points(points),
            Answer::Passage(text) | Answer::Generated(text) => text.clone(),
            Answer::Empty(reason) => (*reason).to_string(),
        }
    }
}

pub const NO_USABLE_DOCUMENT: &str = "no usable document";
pub const NO_DIRECT_ANSWER: &str = "no direct answer found";

pub struct Session {
    pub max_chunks: usize,
    pub window: usize,
    pub top_k: usize,
    pub chunk_size: usize,
    pub overlap: usize,
    normalize_options: NormalizeOptions,
    embedder: HashEmbedder,
    index_path: PathBuf,
    index_name: String,
    lines: Vec<String>,
    documents: Vec<String>,
    index: Option<VectorIndex>,
    transcript: Vec<TranscriptEntry>,
    fallback: Vec<String>,
}

impl Session {
    /// An empty session whose semantic index persists at `index_path`.
    pub fn new(index_path: impl Into<PathBuf>, index_name: &str) -> Self {
        Self {
            max_chunks: DEFAULT_MAX_CHUNKS,
            window: DEFAULT_WINDOW,
            top_k: DEFAULT_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            normalize_options: NormalizeOptions::default(),
            embedder: HashEmbedder::default(),
            index_path: index_path.into(),
            index_name: index_name.to_string(),
            lines: Vec::new(),
            documents: Vec::new(),
            index: None,
            transcript: Vec::new(),
            fallback: default_fallback(),
        }
    }

    pub fn set_normalize_options(&mut self, options: NormalizeOptions) {
        self.normalize_options = options;
    }

    pub fn set_fallback(&mut self, points: Vec<String>) {
        self.fallback = points;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Extract, normalize, and index a batch of files, replacing any
    /// previously ingested corpus.
    ///
    /// Files with unsupported extensions and files whose extraction fails
    /// are skipped; the batch continues. The semantic index is rebuilt
    /// wholesale from the new corpus.
    pub fn ingest(&mut self, paths: &[PathBuf]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut texts = Vec::new();
        let mut names = Vec::new();

        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(DocumentFormat::from_extension)
            else {
                tracing::debug!(file = %name, "skipping unsupported format");
                report.skipped.push(name);
                continue;
            };

            let bytes = std::fs::read(path)?;
            match format.extract(&name, &bytes) {
                Ok(text) => {
                    texts.push(text);
                    names.push(name);
                }
                Err(e) => {
                    tracing::warn!(file = %name, "extraction failed: {e}");
                    report.skipped.push(name);
                }
            }
        }

        self.lines = normalize_batch(&texts, &self.normalize_options);
        self.documents = names;
        report.ingested = self.documents.clone();
        report.line_count = self.lines.len();

        let chunks =
            chunk_text(&self.lines.join("\n"), self.chunk_size, self.overlap);
        report.chunk_count = chunks.len();

        let index = VectorIndex::build(
            &self.index_path,
            &self.index_name,
            &chunks,
            &self.embedder,
        )?;
        self.index = Some(index);

        Ok(report)
    }

    /// Answer a question with the chosen strategy and append the exchange
    /// to the transcript.
    ///
    /// With a `generator`, retrieved context is stuffed into a prompt and
    /// handed to the model; a failed call surfaces as an error and leaves
    /// the transcript untouched.
    pub fn ask(
        &mut self,
        question: &str,
        strategy: Strategy,
        generator: Option<&dyn Generator>,
    ) -> Result<Answer> {
        let answer = self.answer(question, strategy, generator)?;
        self.transcript.push(TranscriptEntry {
            question: question.to_string(),
            answer: answer.render(),
        });
        Ok(answer)
    }

    fn answer(
        &mut self,
        question: &str,
        strategy: Strategy,
        generator: Option<&dyn Generator>,
    ) -> Result<Answer> {
        let context = match strategy {
            Strategy::Lexical => {
                if self.lines.is_empty() {
                    return Ok(Answer::Empty(NO_USABLE_DOCUMENT));
                }
                let retriever = LexicalRetriever {
                    lines: &self.lines,
                    max_chunks: self.max_chunks,
                    window: self.window,
                };
                retriever.retrieve(question)?
            }
            Strategy::Heading => {
                if self.lines.is_empty() {
                    return Ok(Answer::Empty(NO_USABLE_DOCUMENT));
                }
                let retriever =
                    HeadingBoundedRetriever { lines: &self.lines };
                let passage = retriever.retrieve(question)?;
                if passage.is_empty() {
                    return Ok(Answer::Empty(NO_DIRECT_ANSWER));
                }
                if generator.is_none() {
                    return Ok(Answer::Passage(passage));
                }
                passage
            }
            Strategy::Semantic => {
                if self.index.is_none() {
                    self.index = Some(VectorIndex::load(
                        &self.index_path,
                        &self.index_name,
                        &self.embedder,
                    )?);
                }
                let index = self.index.as_ref().ok_or_else(|| {
                    crate::error::Error::IndexNotFound {
                        name: self.index_name.clone(),
                    }
                })?;
                let retriever = SemanticRetriever {
                    index,
                    embedder: &self.embedder,
                    top_k: self.top_k,
                };
                retriever.retrieve(question)?
            }
        };

        if let Some(generator) = generator {
            let prompt = stuff_prompt(&context, question);
            return Ok(Answer::Generated(generator.generate(&prompt)?));
        }

        Ok(Answer::Points(synthesize_points(
            question,
            &context,
            &self.fallback,
        )))
    }

    /// Drop the corpus, the transcript, and the persisted index file.
    pub fn reset(&mut self) -> Result<()> {
        self.lines.clear();
        self.documents.clear();
        self.transcript.clear();
        self.index = None;
        match std::fs::remove_file(&self.index_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        &self.embedder
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("index_name", &self.index_name)
            .field("documents", &self.documents)
            .field("lines", &self.lines.len())
            .field("transcript", &self.transcript.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn test_session(tmp: &tempfile::TempDir) -> Session {
        Session::new(tmp.path().join("default.redb"), "default")
    }

    #[test]
    fn ingest_then_ask_lexical() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = write_doc(
            tmp.path(),
            "ml.txt",
            "Machine learning uses data.\nIt predicts outcomes.\n",
        );

        let mut session = test_session(&tmp);
        let report = session.ingest(&[doc]).unwrap();
        assert_eq!(report.ingested, vec!["ml.txt"]);
        assert_eq!(report.line_count, 2);

        let answer = session
            .ask("What does machine learning use?", Strategy::Lexical, None)
            .unwrap();
        match answer {
            Answer::Points(points) => {
                assert!(points
                    .contains(&"Machine learning uses data.".to_string()));
            }
            other => panic!("expected points, got {other:?}"),
        }
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn heading_strategy_returns_passage() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = write_doc(
            tmp.path(),
            "sections.txt",
            "Introduction\n\
             Machine learning uses data.\n\
             It predicts outcomes.\n\
             Conclusion\n\
             Summary text.\n",
        );

        let mut session = test_session(&tmp);
        session.ingest(&[doc]).unwrap();

        let answer = session
            .ask("What does machine learning use?", Strategy::Heading, None)
            .unwrap();
        assert_eq!(
            answer,
            Answer::Passage(
                "Machine learning uses data.\nIt predicts outcomes."
                    .to_string()
            )
        );
    }

    #[test]
    fn semantic_strategy_round_trips_through_index() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = write_doc(
            tmp.path(),
            "ml.txt",
            "Machine learning uses data to predict outcomes.\n",
        );

        let mut session = test_session(&tmp);
        let report = session.ingest(&[doc]).unwrap();
        assert!(report.chunk_count > 0);

        let answer = session
            .ask("machine learning data", Strategy::Semantic, None)
            .unwrap();
        match answer {
            Answer::Points(points) => assert!(!points.is_empty()),
            other => panic!("expected points, got {other:?}"),
        }
    }

    #[test]
    fn semantic_without_index_is_index_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = test_session(&tmp);

        let err = session
            .ask("anything", Strategy::Semantic, None)
            .unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn empty_corpus_answers_no_usable_document() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = test_session(&tmp);

        let answer =
            session.ask("anything", Strategy::Lexical, None).unwrap();
        assert_eq!(answer, Answer::Empty(NO_USABLE_DOCUMENT));
        assert_eq!(answer.render(), NO_USABLE_DOCUMENT);
    }

    #[test]
    fn unsupported_extension_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let good = write_doc(tmp.path(), "notes.txt", "Useful content here.\n");
        let bad = write_doc(tmp.path(), "image.png", "not a document");

        let mut session = test_session(&tmp);
        let report = session.ingest(&[good, bad]).unwrap();
        assert_eq!(report.ingested, vec!["notes.txt"]);
        assert_eq!(report.skipped, vec!["image.png"]);
    }

    #[test]
    fn failed_extraction_skips_file_and_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let good = write_doc(tmp.path(), "notes.txt", "Useful content here.\n");
        // Garbage bytes with a pdf extension fail extraction.
        let bad = write_doc(tmp.path(), "broken.pdf", "not really a pdf");

        let mut session = test_session(&tmp);
        let report = session.ingest(&[good, bad]).unwrap();
        assert_eq!(report.ingested, vec!["notes.txt"]);
        assert_eq!(report.skipped, vec!["broken.pdf"]);
    }

    #[test]
    fn ingest_replaces_previous_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let first = write_doc(tmp.path(), "a.txt", "First corpus line.\n");
        let second = write_doc(tmp.path(), "b.txt", "Second corpus line.\n");

        let mut session = test_session(&tmp);
        session.ingest(&[first]).unwrap();
        session.ingest(&[second]).unwrap();

        assert_eq!(session.documents(), ["b.txt"]);
        assert_eq!(session.lines(), ["Second corpus line."]);
    }

    #[test]
    fn reset_clears_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = write_doc(tmp.path(), "a.txt", "Some line of text here.\n");

        let mut session = test_session(&tmp);
        session.ingest(&[doc]).unwrap();
        session.ask("text", Strategy::Lexical, None).unwrap();
        assert!(session.index_path().exists());

        session.reset().unwrap();
        assert!(session.lines().is_empty());
        assert!(session.transcript().is_empty());
        assert!(!session.index_path().exists());

        // Resetting twice is fine.
        session.reset().unwrap();
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in
            [Strategy::Lexical, Strategy::Heading, Strategy::Semantic]
        {
            assert_eq!(Strategy::from_name(strategy.name()), Some(strategy));
        }
        assert_eq!(Strategy::from_name("bm25"), None);
    }

    #[test]
    fn explicit_strategy_beats_stored_default() {
        let strategy =
            Strategy::resolve(Some(Strategy::Semantic), Some("heading"))
                .unwrap();
        assert_eq!(strategy, Strategy::Semantic);
    }

    #[test]
    fn stored_default_strategy_is_used() {
        let strategy = Strategy::resolve(None, Some("heading")).unwrap();
        assert_eq!(strategy, Strategy::Heading);
    }

    #[test]
    fn missing_default_strategy_falls_back_to_lexical() {
        assert_eq!(Strategy::resolve(None, None).unwrap(), Strategy::Lexical);
    }

    #[test]
    fn garbage_stored_strategy_is_a_config_error() {
        let err = Strategy::resolve(None, Some("bm25")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> crate::error::Result<String> {
            Err(Error::Generative("quota exceeded".into()))
        }
    }

    struct EchoGenerator;

    impl Generator for EchoGenerator {
        fn generate(&self, prompt: &str) -> crate::error::Result<String> {
            Ok(format!("generated from {} chars", prompt.len()))
        }
    }

    #[test]
    fn failed_generation_leaves_transcript_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = write_doc(tmp.path(), "a.txt", "Some line of text here.\n");

        let mut session = test_session(&tmp);
        session.ingest(&[doc]).unwrap();

        let err = session
            .ask("text", Strategy::Lexical, Some(&FailingGenerator))
            .unwrap_err();
        assert!(matches!(err, Error::Generative(_)));
        assert!(session.transcript().is_empty());

        let answer = session
            .ask("text", Strategy::Lexical, Some(&EchoGenerator))
            .unwrap();
        assert!(matches!(answer, Answer::Generated(_)));
        assert_eq!(session.transcript().len(), 1);
    }
}
