use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ragdb_core::traits::VectorIndex;
use ragdb_core::types::ScoredChunk;
use ragdb_core::Result;
use ragdb_vector::FlatIndex;

use crate::collection::Collection;

pub const NO_CONTEXT: &str = "No relevant context found.";

/// Language model behind the chat surface. Retrieval never calls it.
pub trait Generator: Send + Sync {
    fn generate(&self, system_context: &str, user_query: &str) -> Result<String>;
}

impl<G: Generator + ?Sized> Generator for Arc<G> {
    fn generate(&self, system_context: &str, user_query: &str) -> Result<String> {
        (**self).generate(system_context, user_query)
    }
}

/// Retrieved chunk texts separated by blank lines, or `None` when nothing
/// was retrieved.
pub fn build_context(chunks: &[ScoredChunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }
    Some(chunks.iter().map(|c| c.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n"))
}

pub fn system_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful AI assistant that answers questions based on the provided context.\n\
         Use the following context to answer the user's question. If the context doesn't contain enough information\n\
         to answer the question, say so and provide a general helpful response.\n\
         \n\
         Context: {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub context: String,
    pub query: String,
    /// Distinct sources of the retrieved chunks, sorted.
    pub sources: Vec<String>,
}

pub struct RagChat<G: Generator, I: VectorIndex = FlatIndex> {
    collection: Arc<Collection<I>>,
    generator: G,
}

impl<G: Generator, I: VectorIndex> RagChat<G, I> {
    pub fn new(collection: Arc<Collection<I>>, generator: G) -> Self {
        Self { collection, generator }
    }

    pub fn chat(&self, query: &str, k: usize) -> Result<ChatResponse> {
        let hits = self.collection.query(query, k)?;
        let context = build_context(&hits).unwrap_or_else(|| NO_CONTEXT.to_string());
        let sources: BTreeSet<&str> = hits.iter().map(|h| h.chunk.source.as_str()).collect();
        let response = self.generator.generate(&system_prompt(&context, query), query)?;
        Ok(ChatResponse {
            response,
            sources: sources.into_iter().map(str::to_string).collect(),
            context,
            query: query.to_string(),
        })
    }
}
