use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ragdb_core::chunker::Chunker;
use ragdb_core::config::Settings;
use ragdb_core::loader::{DocumentLoader, LoadedDocument};
use ragdb_core::traits::{Embedder, VectorIndex};
use ragdb_core::types::{ChunkMeta, CollectionStats, IngestReport, Meta, ScoredChunk};
use ragdb_core::{Error, Result};
use ragdb_vector::{DocumentStore, FlatIndex, JsonSnapshotStore, Snapshot, SnapshotStore};

/// Where an ingested document comes from.
#[derive(Debug, Clone)]
pub enum IngestSource {
    Path(PathBuf),
    /// An upload; `extension` picks the loader (`"pdf"`, `".md"`, ...).
    Bytes { bytes: Vec<u8>, extension: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Empty,
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub max_file_size: u64,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<&Settings> for CollectionOptions {
    fn from(s: &Settings) -> Self {
        Self { chunk_size: s.chunking.chunk_size, overlap: s.chunking.overlap, max_file_size: s.ingest.max_file_size }
    }
}

impl From<Settings> for CollectionOptions {
    fn from(s: Settings) -> Self { (&s).into() }
}

struct Inner<I> {
    store: DocumentStore,
    index: I,
}

/// One knowledge base: document store and vector index kept in lockstep.
///
/// Both live behind a single `RwLock`. Loading, chunking and embedding
/// happen before the write lock is taken; persistence happens after it is
/// released, under `flush_lock`. Only `ingest` marks the collection dirty,
/// and only `clear` erases the snapshot, so a session that merely reads
/// (even one that discarded an unusable snapshot) leaves the file alone.
pub struct Collection<I: VectorIndex = FlatIndex> {
    inner: RwLock<Inner<I>>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    loader: DocumentLoader,
    snapshots: Box<dyn SnapshotStore>,
    flush_lock: Mutex<()>,
    dirty: AtomicBool,
}

impl Collection<FlatIndex> {
    pub fn open(embedder: Arc<dyn Embedder>, snapshots: Box<dyn SnapshotStore>, options: CollectionOptions) -> Result<Self> {
        Self::with_index(FlatIndex::new(), embedder, snapshots, options)
    }

    /// Collection persisted at `storage.snapshot_path`.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        settings.validate()?;
        let snapshots = JsonSnapshotStore::new(settings.snapshot_path());
        Self::open(embedder, Box::new(snapshots), settings.into())
    }
}

impl<I: VectorIndex> Collection<I> {
    pub fn with_index(
        mut index: I,
        embedder: Arc<dyn Embedder>,
        snapshots: Box<dyn SnapshotStore>,
        options: CollectionOptions,
    ) -> Result<Self> {
        let chunker = Chunker::new(options.chunk_size, options.overlap)?;
        index.clear();
        let store = match rehydrate(&mut index, embedder.as_ref(), snapshots.as_ref()) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "discarding snapshot; starting empty");
                index.clear();
                DocumentStore::new()
            }
        };
        Ok(Self {
            inner: RwLock::new(Inner { store, index }),
            embedder,
            chunker,
            loader: DocumentLoader::new(options.max_file_size),
            snapshots,
            flush_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    pub fn chunker(&self) -> &Chunker { &self.chunker }

    pub fn ingest(&self, input: IngestSource, source_name: &str) -> Result<IngestReport> {
        let LoadedDocument { kind, text } = match &input {
            IngestSource::Path(path) => self.loader.load_path(path)?,
            IngestSource::Bytes { bytes, extension } => self.loader.load_bytes(bytes, extension)?,
        };
        let texts = self.chunker.split(&text);
        if texts.is_empty() {
            return Err(Error::EmptyDocument(source_name.to_string()));
        }
        let vectors = self.embedder.embed(&texts)?;

        let mut extra = Meta::new();
        extra.insert("content_type".into(), kind.content_type().into());
        let metadata: Vec<ChunkMeta> = (0..texts.len())
            .map(|i| ChunkMeta { source: source_name.to_string(), sequence_index: i, extra_metadata: extra.clone() })
            .collect();
        let created = texts.len();

        {
            let mut inner = self.write();
            let Inner { store, index } = &mut *inner;
            let before = store.len();
            let ids = store.append(texts, metadata).map_err(|e| self.violation(e))?;
            if let Err(e) = index.insert(&ids, vectors) {
                store.truncate(before);
                return Err(self.violation(e));
            }
            self.dirty.store(true, Ordering::Release);
        }
        tracing::info!(source = source_name, chunks = created, "ingested document");

        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "snapshot after ingest failed");
        }
        Ok(IngestReport { source: source_name.to_string(), chunks_created: created })
    }

    /// Up to `k` chunks, best first. An empty collection yields an empty
    /// result without calling the embedder.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        if self.read().store.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed_one(text)?;

        let inner = self.read();
        let hits = inner.index.search(&vector, k).map_err(|e| self.violation(e))?;
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        let chunks = inner.store.get(&ids).map_err(|e| self.violation(e))?;
        drop(inner);

        tracing::debug!(k, hits = hits.len(), "query");
        Ok(chunks.into_iter().zip(hits).map(|(chunk, hit)| ScoredChunk { chunk, score: hit.score }).collect())
    }

    pub fn stats(&self) -> CollectionStats {
        self.read().store.stats()
    }

    pub fn state(&self) -> CollectionState {
        if self.read().store.is_empty() { CollectionState::Empty } else { CollectionState::Populated }
    }

    pub fn len(&self) -> usize { self.read().store.len() }

    pub fn is_empty(&self) -> bool { self.read().store.is_empty() }

    /// Index size; always equal to `len()`.
    pub fn index_size(&self) -> usize { self.read().index.size() }

    /// Drop every chunk and erase the persisted snapshot.
    pub fn clear(&self) -> Result<()> {
        let _flush = self.flush_guard();
        {
            let mut inner = self.write();
            inner.store.clear();
            inner.index.clear();
            self.dirty.store(false, Ordering::Release);
        }
        self.snapshots.erase()?;
        tracing::info!("collection cleared");
        Ok(())
    }

    /// Save the current state if an ingest changed it since the last save.
    /// Never erases; an empty collection has nothing to write.
    pub fn flush(&self) -> Result<()> {
        let _flush = self.flush_guard();
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let snapshot = {
            let inner = self.read();
            if inner.store.is_empty() {
                return Ok(());
            }
            self.snapshot_of(&inner)
        };
        let saved = snapshot.and_then(|s| self.snapshots.save(&s));
        if saved.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        saved
    }

    /// True when an ingest has not been saved yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Final flush; consumes the collection. A no-op for read-only sessions.
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    fn snapshot_of(&self, inner: &Inner<I>) -> Result<Snapshot> {
        let chunks = inner.store.chunks().to_vec();
        let entries = inner.index.entries();
        if entries.len() != chunks.len() {
            return Err(self.violation(Error::ArityMismatch { left: chunks.len(), right: entries.len() }));
        }
        let mut vectors = Vec::with_capacity(entries.len());
        for (chunk, (id, v)) in chunks.iter().zip(entries) {
            if chunk.id != id {
                return Err(self.violation(Error::NotFound(chunk.id)));
            }
            vectors.push(v);
        }
        Ok(Snapshot {
            embedder_id: self.embedder.id().to_string(),
            dim: inner.index.dim().unwrap_or_else(|| self.embedder.dim()),
            chunks,
            vectors,
        })
    }

    fn violation(&self, e: Error) -> Error {
        if e.is_invariant_violation() {
            tracing::error!(error = %e, "store and index disagree");
        }
        e
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<I>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<I>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush_guard(&self) -> MutexGuard<'_, ()> {
        self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rehydrate<I: VectorIndex>(index: &mut I, embedder: &dyn Embedder, snapshots: &dyn SnapshotStore) -> Result<DocumentStore> {
    let Some(snapshot) = snapshots.load()? else {
        return Ok(DocumentStore::new());
    };
    if snapshot.embedder_id != embedder.id() || snapshot.dim != embedder.dim() {
        return Err(Error::Persistence(format!(
            "snapshot was built by {} (d{}), current embedder is {} (d{})",
            snapshot.embedder_id, snapshot.dim, embedder.id(), embedder.dim()
        )));
    }
    snapshot.validate()?;
    let ids: Vec<_> = snapshot.chunks.iter().map(|c| c.id).collect();
    let store = DocumentStore::from_chunks(snapshot.chunks)?;
    index.insert(&ids, snapshot.vectors)?;
    tracing::info!(chunks = store.len(), next_id = store.next_id(), "rehydrated collection");
    Ok(store)
}
