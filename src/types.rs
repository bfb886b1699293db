//! Value types shared between the sectionizer, chunker, tracker and index.

use crate::todo::Priority;
use serde::{Deserialize, Serialize};

/// A heading plus the raw Markdown body beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub header: String,
    pub content: String,
    /// Heading depth, 1..=6
    pub level: u8,
}

impl Section {
    pub fn new(header: impl Into<String>, content: impl Into<String>, level: u8) -> Self {
        Self {
            header: header.into(),
            content: content.into(),
            level,
        }
    }

    /// Text handed to the chunker when indexing: the heading line followed by the body
    pub fn indexed_text(&self) -> String {
        format!("# {}\n\n{}", self.header, self.content)
    }
}

/// Kind of chunk stored in the index (`type` in the stored metadata)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    #[default]
    Text,
    Todo,
}

/// Metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Forward-slash path of the note relative to the data root
    pub doc_id: String,
    /// Ordinal of the section within the document
    pub section_id: usize,
    /// Ordinal of the chunk within the section's split output
    pub chunk_id: usize,
    pub header: String,
    pub level: u8,
    /// Number of chunks the owning section was split into
    pub total_chunks: usize,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    #[serde(default)]
    pub has_todo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_priority: Option<Priority>,
}

/// An addressable span of note text, the unit of indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{relative_path}:section_{i}:chunk_{j}"`
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Build the stable chunk id for a section/chunk ordinal pair
pub fn chunk_id(doc_id: &str, section_id: usize, chunk_id: usize) -> String {
    format!("{}:section_{}:chunk_{}", doc_id, section_id, chunk_id)
}

/// A chunk returned from the semantic index, ranked by score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}
