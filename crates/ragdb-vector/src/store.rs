use std::collections::{BTreeSet, HashMap};

use ragdb_core::types::{Chunk, ChunkId, ChunkMeta, CollectionStats};
use ragdb_core::{Error, Result};

/// Append-only chunk storage keyed by a monotonically assigned id.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
    positions: HashMap<ChunkId, usize>,
    next_id: ChunkId,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Rebuild from persisted chunks. Ids must be strictly increasing;
    /// new ids continue from the largest one.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        let mut store = Self::new();
        for chunk in chunks {
            if store.chunks.last().is_some_and(|last| last.id >= chunk.id) {
                return Err(Error::DuplicateId(chunk.id));
            }
            store.next_id = chunk.id + 1;
            store.positions.insert(chunk.id, store.chunks.len());
            store.chunks.push(chunk);
        }
        Ok(store)
    }

    pub fn append(&mut self, texts: Vec<String>, metadata: Vec<ChunkMeta>) -> Result<Vec<ChunkId>> {
        if texts.len() != metadata.len() {
            return Err(Error::ArityMismatch { left: texts.len(), right: metadata.len() });
        }
        let mut ids = Vec::with_capacity(texts.len());
        for (text, meta) in texts.into_iter().zip(metadata) {
            let id = self.next_id;
            self.next_id += 1;
            self.positions.insert(id, self.chunks.len());
            self.chunks.push(Chunk {
                id,
                text,
                source: meta.source,
                sequence_index: meta.sequence_index,
                extra_metadata: meta.extra_metadata,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    /// Chunks for `ids`, in the order asked for.
    pub fn get(&self, ids: &[ChunkId]) -> Result<Vec<Chunk>> {
        ids.iter()
            .map(|id| {
                self.positions.get(id)
                    .map(|&pos| self.chunks[pos].clone())
                    .ok_or(Error::NotFound(*id))
            })
            .collect()
    }

    /// Drop chunks past `len` and give their ids back. Used to undo an
    /// append whose index insert failed.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.chunks.len() { return; }
        for chunk in self.chunks.drain(len..) {
            self.positions.remove(&chunk.id);
        }
        self.next_id = self.chunks.last().map_or(0, |c| c.id + 1);
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.positions.clear();
        self.next_id = 0;
    }

    pub fn stats(&self) -> CollectionStats {
        let sources: BTreeSet<&str> = self.chunks.iter().map(|c| c.source.as_str()).collect();
        CollectionStats {
            total_chunks: self.chunks.len(),
            total_sources: sources.len(),
            source_files: sources.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
    pub fn next_id(&self) -> ChunkId { self.next_id }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }
}
