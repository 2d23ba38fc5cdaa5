//! Domain types shared by the store, the index and the coordinator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ChunkId = u64;
/// Ordered so that serialized snapshots are byte-stable.
pub type Meta = BTreeMap<String, String>;

/// A chunk of a source document that is independently indexed.
///
/// - `id`: assigned by the document store, strictly increasing
/// - `source`: origin file identifier
/// - `sequence_index`: position within `source`, in chunker order
/// - `extra_metadata`: free-form attributes (e.g. `content_type`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub sequence_index: usize,
    #[serde(default)]
    pub extra_metadata: Meta,
}

/// Everything about a chunk except its id, which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub source: String,
    pub sequence_index: usize,
    #[serde(default)]
    pub extra_metadata: Meta,
}

/// The minimal surface returned by the index.
///
/// `score` is cosine similarity in `[-1, 1]`; higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
}

/// A stored chunk joined with its query score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_chunks: usize,
    pub total_sources: usize,
    pub source_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    pub chunks_created: usize,
}
