//! Persisted semantic index: (chunk, vector) pairs with exact
//! nearest-neighbor lookup by cosine similarity.
//!
//! One redb file per named index. Binary layout per vector entry:
//! `dimension * 4` bytes of f32 LE values. The embedder's id and
//! dimension are stored alongside; an index is only readable with the
//! same embedding function that built it.
//!
//! Rebuilding fully replaces the previous index. There is no incremental
//! update: the build consumes the whole chunk batch and the file is
//! recreated from scratch.

use std::path::Path;

use rayon::prelude::*;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};

use crate::{
    chunking::Chunk,
    embedding::{cosine_similarity, Embedder},
    error::{Error, Result},
};

const CHUNKS: TableDefinition<u32, &str> = TableDefinition::new("chunks");
const VECTORS: TableDefinition<u32, &[u8]> = TableDefinition::new("vectors");
const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

const META_EMBEDDER_ID: &str = "embedder_id";
const META_DIMENSION: &str = "dimension";

/// A chunk retrieved from the index, with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: u32,
    pub text: String,
    pub score: f32,
}

/// A named, persisted semantic index.
pub struct VectorIndex {
    db: Database,
    name: String,
    embedder_id: String,
    dimension: usize,
}

impl VectorIndex {
    /// Embed `chunks` and persist them under `path`, fully replacing any
    /// prior index at that location.
    pub fn build(
        path: &Path,
        name: &str,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        // Truncate-and-replace gives the "rebuild fully replaces" contract.
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let db = Database::create(path)?;

        let vectors: Vec<Vec<f32>> = chunks
            .par_iter()
            .map(|chunk| embedder.embed(&chunk.text))
            .collect();

        let txn = db.begin_write()?;
        {
            let mut meta = txn.open_table(META)?;
            meta.insert(META_EMBEDDER_ID, embedder.id().as_str())?;
            meta.insert(
                META_DIMENSION,
                embedder.dimension().to_string().as_str(),
            )?;

            let mut chunk_table = txn.open_table(CHUNKS)?;
            let mut vector_table = txn.open_table(VECTORS)?;
            for (i, (chunk, vector)) in
                chunks.iter().zip(&vectors).enumerate()
            {
                let id = i as u32;
                chunk_table.insert(id, chunk.text.as_str())?;
                vector_table.insert(id, bytemuck::cast_slice(vector))?;
            }
        }
        txn.commit()?;

        tracing::debug!(
            index = name,
            chunks = chunks.len(),
            embedder = %embedder.id(),
            "built semantic index"
        );

        Ok(Self {
            db,
            name: name.to_string(),
            embedder_id: embedder.id(),
            dimension: embedder.dimension(),
        })
    }

    /// Rehydrate a previously persisted index.
    ///
    /// Fails with [`Error::IndexNotFound`] if nothing is persisted at
    /// `path`, and with [`Error::IndexCorrupted`] if the stored metadata
    /// is missing or does not match `embedder`.
    pub fn load(
        path: &Path,
        name: &str,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        if !path.exists() {
            return Err(Error::IndexNotFound {
                name: name.to_string(),
            });
        }

        let db = Database::open(path)?;
        let (embedder_id, dimension) = {
            let txn = db.begin_read()?;
            let meta = txn.open_table(META).map_err(|e| corrupted(name, e))?;

            let embedder_id = meta
                .get(META_EMBEDDER_ID)?
                .map(|v| v.value().to_string())
                .ok_or_else(|| {
                    corrupted(name, "missing embedder id metadata")
                })?;
            let dimension: usize = meta
                .get(META_DIMENSION)?
                .and_then(|v| v.value().parse().ok())
                .ok_or_else(|| {
                    corrupted(name, "missing or invalid dimension metadata")
                })?;
            (embedder_id, dimension)
        };

        if embedder_id != embedder.id() {
            return Err(corrupted(
                name,
                format!(
                    "built with embedder '{embedder_id}', queried with '{}'",
                    embedder.id()
                ),
            ));
        }
        if dimension != embedder.dimension() {
            return Err(corrupted(
                name,
                format!(
                    "stored dimension {dimension} does not match embedder \
                     dimension {}",
                    embedder.dimension()
                ),
            ));
        }

        Ok(Self {
            db,
            name: name.to_string(),
            embedder_id,
            dimension,
        })
    }

    /// Return the `k` chunks nearest to `question`, nearest first.
    ///
    /// Fewer than `k` stored chunks returns all of them. Ties are broken
    /// by chunk id ascending, which is document order.
    pub fn query(
        &self,
        question: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk>> {
        if embedder.id() != self.embedder_id {
            return Err(corrupted(
                &self.name,
                format!(
                    "index built with embedder '{}', queried with '{}'",
                    self.embedder_id,
                    embedder.id()
                ),
            ));
        }

        let query_vector = embedder.embed(question);

        let txn = self.db.begin_read()?;
        let vector_table = txn.open_table(VECTORS)?;
        let chunk_table = txn.open_table(CHUNKS)?;

        let mut scored: Vec<(u32, f32)> = Vec::new();
        for entry in vector_table.iter()? {
            let (id, bytes) = entry?;
            let bytes = bytes.value();
            if bytes.len() != self.dimension * std::mem::size_of::<f32>() {
                return Err(corrupted(
                    &self.name,
                    format!("vector entry {} has wrong length", id.value()),
                ));
            }
            // pod_collect_to_vec copes with unaligned value bytes.
            let vector: Vec<f32> = bytemuck::pod_collect_to_vec(bytes);
            scored
                .push((id.value(), cosine_similarity(&query_vector, &vector)));
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        let mut results = Vec::with_capacity(scored.len());
        for (id, score) in scored {
            let text = chunk_table
                .get(id)?
                .map(|v| v.value().to_string())
                .ok_or_else(|| {
                    corrupted(
                        &self.name,
                        format!("vector {id} has no chunk text"),
                    )
                })?;
            results.push(ScoredChunk {
                chunk_id: id,
                text,
                score,
            });
        }

        Ok(results)
    }

    /// Number of stored chunks.
    pub fn len(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("name", &self.name)
            .field("embedder_id", &self.embedder_id)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

fn corrupted(name: &str, reason: impl ToString) -> Error {
    Error::IndexCorrupted {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
