//! Storage side of a ragdb collection: the vector index, the chunk store,
//! and snapshot persistence.

pub mod index;
pub mod snapshot;
pub mod store;

pub use index::FlatIndex;
pub use snapshot::{JsonSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore, SNAPSHOT_VERSION};
pub use store::DocumentStore;
