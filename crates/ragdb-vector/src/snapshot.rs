//! Collection snapshots.
//!
//! A snapshot is the full state of one collection: its chunks, the vector
//! for each chunk (same order), and the id of the embedder that produced
//! them. [`JsonSnapshotStore`] keeps it as a single JSON file with a blake3
//! checksum; [`MemorySnapshotStore`] keeps it in process.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use ragdb_core::types::Chunk;
use ragdb_core::{Error, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub embedder_id: String,
    pub dim: usize,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Vec<f32>>,
}

impl Snapshot {
    /// Shape checks: one vector per chunk, all of length `dim`.
    pub fn validate(&self) -> Result<()> {
        if self.chunks.len() != self.vectors.len() {
            return Err(Error::ArityMismatch { left: self.chunks.len(), right: self.vectors.len() });
        }
        if let Some(v) = self.vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: v.len() });
        }
        Ok(())
    }
}

pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
    /// Remove the saved snapshot; a no-op when there is none.
    fn erase(&self) -> Result<()>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    embedder_id: &'a str,
    dim: usize,
    saved_at_ms: i64,
    checksum: String,
    chunks: &'a [Chunk],
    vectors: &'a [Vec<f32>],
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    embedder_id: String,
    dim: usize,
    #[allow(dead_code)]
    saved_at_ms: i64,
    checksum: String,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

fn checksum(chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<String> {
    let body = serde_json::to_vec(&(chunks, vectors))
        .map_err(|e| Error::Persistence(format!("serialize snapshot: {e}")))?;
    Ok(blake3::hash(&body).to_hex().to_string())
}

/// Snapshot kept as one JSON document on disk, replaced atomically.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        let env: Envelope = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Persistence(format!("parse {}: {e}", self.path.display())))?;
        if env.version != SNAPSHOT_VERSION {
            return Err(Error::Persistence(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                env.version
            )));
        }
        if checksum(&env.chunks, &env.vectors)? != env.checksum {
            return Err(Error::Persistence(format!("checksum mismatch in {}", self.path.display())));
        }
        let snapshot = Snapshot { embedder_id: env.embedder_id, dim: env.dim, chunks: env.chunks, vectors: env.vectors };
        snapshot.validate()?;
        tracing::debug!(path = %self.path.display(), chunks = snapshot.chunks.len(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let env = EnvelopeRef {
            version: SNAPSHOT_VERSION,
            embedder_id: &snapshot.embedder_id,
            dim: snapshot.dim,
            saved_at_ms: Utc::now().timestamp_millis(),
            checksum: checksum(&snapshot.chunks, &snapshot.vectors)?,
            chunks: &snapshot.chunks,
            vectors: &snapshot.vectors,
        };
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut w, &env)
                .map_err(|e| Error::Persistence(format!("write snapshot: {e}")))?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!(path = %self.path.display(), chunks = snapshot.chunks.len(), "snapshot saved");
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// In-process snapshot slot, for tests and ephemeral collections.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self { Self::default() }

    fn slot(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>> { Ok(self.slot().clone()) }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.slot() = Some(snapshot.clone());
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

/// Lets a caller keep a handle on the store it passed to a collection.
impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Snapshot>> { (**self).load() }
    fn save(&self, snapshot: &Snapshot) -> Result<()> { (**self).save(snapshot) }
    fn erase(&self) -> Result<()> { (**self).erase() }
}
