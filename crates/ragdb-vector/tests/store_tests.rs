use std::sync::Arc;

use ragdb_core::types::{Chunk, ChunkMeta, Meta};
use ragdb_core::Error;
use ragdb_vector::{DocumentStore, JsonSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};

fn meta(source: &str, seq: usize) -> ChunkMeta {
    ChunkMeta { source: source.into(), sequence_index: seq, extra_metadata: Meta::new() }
}

fn sample_snapshot() -> Snapshot {
    let mut store = DocumentStore::new();
    store.append(
        vec!["alpha".into(), "beta".into()],
        vec![meta("a.txt", 0), meta("a.txt", 1)],
    ).unwrap();
    Snapshot {
        embedder_id: "hash:xxh64:d2".into(),
        dim: 2,
        chunks: store.chunks().to_vec(),
        vectors: vec![vec![0.6, 0.8], vec![1.0, 0.0]],
    }
}

#[test]
fn append_assigns_increasing_ids() {
    let mut store = DocumentStore::new();
    let first = store.append(vec!["a".into(), "b".into()], vec![meta("x.md", 0), meta("x.md", 1)]).unwrap();
    let second = store.append(vec!["c".into()], vec![meta("y.md", 0)]).unwrap();
    assert_eq!(first, vec![0, 1]);
    assert_eq!(second, vec![2]);
    let got = store.get(&[2, 0]).unwrap();
    assert_eq!(got[0].text, "c");
    assert_eq!(got[1].text, "a");
    assert_eq!(got[1].sequence_index, 0);
}

#[test]
fn append_checks_arity() {
    let mut store = DocumentStore::new();
    let err = store.append(vec!["a".into()], vec![]).unwrap_err();
    assert!(matches!(err, Error::ArityMismatch { left: 1, right: 0 }));
    assert!(store.is_empty());
}

#[test]
fn missing_id_is_not_found() {
    let mut store = DocumentStore::new();
    store.append(vec!["a".into()], vec![meta("x", 0)]).unwrap();
    assert!(matches!(store.get(&[0, 9]), Err(Error::NotFound(9))));
}

#[test]
fn stats_count_distinct_sources() {
    let mut store = DocumentStore::new();
    store.append(
        vec!["a".into(), "b".into(), "c".into()],
        vec![meta("notes.md", 0), meta("notes.md", 1), meta("book.pdf", 0)],
    ).unwrap();
    let stats = store.stats();
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.total_sources, 2);
    assert_eq!(stats.source_files, vec!["book.pdf".to_string(), "notes.md".to_string()]);
}

#[test]
fn truncate_rolls_back_an_append() {
    let mut store = DocumentStore::new();
    store.append(vec!["a".into()], vec![meta("x", 0)]).unwrap();
    store.append(vec!["b".into(), "c".into()], vec![meta("y", 0), meta("y", 1)]).unwrap();
    store.truncate(1);
    assert_eq!(store.len(), 1);
    assert_eq!(store.next_id(), 1);
    assert!(matches!(store.get(&[1]), Err(Error::NotFound(1))));
    assert_eq!(store.append(vec!["d".into()], vec![meta("z", 0)]).unwrap(), vec![1]);
}

#[test]
fn rehydrated_store_continues_ids() {
    let chunks = vec![
        Chunk { id: 3, text: "x".into(), source: "s".into(), sequence_index: 0, extra_metadata: Meta::new() },
        Chunk { id: 8, text: "y".into(), source: "s".into(), sequence_index: 1, extra_metadata: Meta::new() },
    ];
    let mut store = DocumentStore::from_chunks(chunks).unwrap();
    assert_eq!(store.next_id(), 9);
    assert_eq!(store.append(vec!["z".into()], vec![meta("t", 0)]).unwrap(), vec![9]);
}

#[test]
fn rehydration_rejects_unordered_ids() {
    let c = |id| Chunk { id, text: "x".into(), source: "s".into(), sequence_index: 0, extra_metadata: Meta::new() };
    assert!(matches!(DocumentStore::from_chunks(vec![c(2), c(2)]), Err(Error::DuplicateId(2))));
}

#[test]
fn clear_restarts_ids() {
    let mut store = DocumentStore::new();
    store.append(vec!["a".into()], vec![meta("x", 0)]).unwrap();
    store.clear();
    store.clear();
    assert_eq!(store.stats().total_chunks, 0);
    assert_eq!(store.append(vec!["b".into()], vec![meta("x", 0)]).unwrap(), vec![0]);
}

#[test]
fn json_snapshot_round_trip() -> ragdb_core::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonSnapshotStore::new(dir.path().join("nested/snapshot.json"));
    assert!(store.load()?.is_none());

    let snap = sample_snapshot();
    store.save(&snap)?;
    assert_eq!(store.load()?, Some(snap.clone()));

    store.erase()?;
    store.erase()?;
    assert!(store.load()?.is_none());
    Ok(())
}

#[test]
fn tampered_snapshot_is_rejected() -> ragdb_core::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("snapshot.json");
    let store = JsonSnapshotStore::new(&path);
    store.save(&sample_snapshot())?;

    let raw = std::fs::read_to_string(&path)?;
    std::fs::write(&path, raw.replace("alpha", "gamma"))?;
    assert!(matches!(store.load(), Err(Error::Persistence(_))));

    std::fs::write(&path, "{ not json")?;
    assert!(matches!(store.load(), Err(Error::Persistence(_))));
    Ok(())
}

#[test]
fn snapshot_shape_is_validated() {
    let mut snap = sample_snapshot();
    snap.vectors.pop();
    assert!(matches!(snap.validate(), Err(Error::ArityMismatch { .. })));
    let mut snap = sample_snapshot();
    snap.vectors[1] = vec![1.0];
    assert!(matches!(snap.validate(), Err(Error::DimensionMismatch { expected: 2, actual: 1 })));
}

#[test]
fn memory_store_shared_through_arc() -> ragdb_core::Result<()> {
    let mem = Arc::new(MemorySnapshotStore::new());
    let boxed: Box<dyn SnapshotStore> = Box::new(mem.clone());
    boxed.save(&sample_snapshot())?;
    assert_eq!(mem.load()?.map(|s| s.chunks.len()), Some(2));
    boxed.erase()?;
    assert!(mem.load()?.is_none());
    Ok(())
}
