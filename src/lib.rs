//! docqa - answer questions against your own documents from the terminal.
//!
//! docqa ingests PDF, plain-text, and slide-deck files, normalizes them
//! into clean lines, and answers questions with one of three retrieval
//! strategies: lexical line scoring, heading-bounded span extraction, or
//! nearest-neighbor lookup in a persisted vector index built with a
//! deterministic feature-hashing embedder. Retrieved context is either
//! condensed into extractive answer points or handed to a generative
//! model.
//!
//! # Quick start
//!
//! ```no_run
//! use docqa::{DataDir, Session, Strategy};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let index_path = data_dir.index_db("default").unwrap();
//! let mut session = Session::new(index_path, "default");
//!
//! session.ingest(&["notes.pdf".into(), "slides.pptx".into()]).unwrap();
//!
//! let answer = session
//!     .ask("what is supervised learning?", Strategy::Lexical, None)
//!     .unwrap();
//! println!("{}", answer.render());
//! ```

pub mod chunking;
pub mod cli;
pub mod config_db;
pub mod data_dir;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod normalize;
pub mod retriever;
pub mod session;
pub mod synthesize;
pub mod text_util;
pub mod vector_index;

pub use config_db::ConfigDb;
pub use data_dir::DataDir;
pub use embedding::{Embedder, HashEmbedder};
pub use error::{Error, Result};
pub use generate::{GeminiGenerator, Generator};
pub use session::{Answer, Session, Strategy};
pub use vector_index::VectorIndex;
