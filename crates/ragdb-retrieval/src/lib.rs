//! Retrieval coordinator: ingestion and query over one collection, plus
//! the async boundary and chat assembly built on top of it.

pub mod api;
pub mod chat;
pub mod collection;

pub use api::{QueryRequest, QueryResponse, RagService, UploadResponse};
pub use chat::{build_context, ChatResponse, Generator, RagChat};
pub use collection::{Collection, CollectionOptions, CollectionState, IngestSource};
