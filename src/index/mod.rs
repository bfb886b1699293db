//! Interface to the semantic index that chunks are embedded into, plus a
//! local keyword-ranked implementation.

mod keyword;
mod tokenizer;

pub use keyword::KeywordIndex;

use crate::error::IndexError;
use crate::types::{Chunk, RetrievedChunk};
use anyhow::Result;

/// Operations the indexing pipeline needs from an index backend.
///
/// Inserts are staged until [`SemanticIndex::persist`]; a backend that
/// cannot delete single entries keeps the default [`SemanticIndex::remove`],
/// and callers treat stale entries as superseded rather than removed.
pub trait SemanticIndex {
    /// Stage a chunk; re-inserting an id replaces the earlier entry
    fn insert(&mut self, chunk: &Chunk) -> Result<()>;

    /// Ranked chunks for a free-text query
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Make staged changes durable and visible to [`SemanticIndex::retrieve`]
    fn persist(&mut self) -> Result<()>;

    fn is_empty(&self) -> Result<bool>;

    /// Number of persisted entries
    fn len(&self) -> Result<usize>;

    /// Stage removal of entries by chunk id
    fn remove(&mut self, chunk_ids: &[String]) -> Result<usize> {
        let _ = chunk_ids;
        Err(IndexError::DeleteUnsupported.into())
    }

    /// Stage removal of every entry
    fn clear(&mut self) -> Result<()>;
}

/// Whether an index error only means the backend lacks point deletes
pub fn is_delete_unsupported(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::DeleteUnsupported)
    )
}
