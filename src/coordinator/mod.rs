//! Application context for note-rag
//!
//! [`NoteRag`] owns one handle to each component (tracker, TODO store,
//! sectionizer, chunker, index) and wires them into the indexing and TODO
//! operations. It is constructed once and passed by reference.

mod indexing;
mod todos;

use crate::chunker::TextChunker;
use crate::config::Config;
use crate::index::{KeywordIndex, SemanticIndex, is_delete_unsupported};
use crate::indexer::{NoteFile, read_note};
use crate::markdown::MarkdownParser;
use crate::todo::{TodoStats, TodoStore};
use crate::tracker::ChangeTracker;
use crate::types::{Chunk, RetrievedChunk};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Lifecycle of a note with respect to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Not indexed yet, or its first indexing attempt failed
    Unseen,
    /// Index content matches the file
    Indexed,
    /// Changed on disk but could not be reindexed this pass
    Stale,
    /// Changed on disk and reindexed this pass
    Reindexed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    Full,
    Incremental,
}

/// Summary of one indexing pass
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub mode: IndexMode,
    /// Notes whose chunks were (re)computed
    pub files_indexed: usize,
    /// Chunks inserted into the index
    pub chunks_created: usize,
    /// Chunks of changed notes whose text was unchanged
    pub chunks_skipped: usize,
    /// Chunk ids dropped from the chunk table
    pub chunks_removed: usize,
    /// Non-fatal per-file failures
    pub errors: Vec<String>,
    pub file_states: BTreeMap<String, FileState>,
    pub duration_ms: u64,
}

impl IndexReport {
    fn new(mode: IndexMode) -> Self {
        Self {
            mode,
            files_indexed: 0,
            chunks_created: 0,
            chunks_skipped: 0,
            chunks_removed: 0,
            errors: Vec::new(),
            file_states: BTreeMap::new(),
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub data_dir: PathBuf,
    pub persist_dir: PathBuf,
    /// Notes currently on disk
    pub total_documents: usize,
    pub tracked_documents: usize,
    pub tracked_chunks: usize,
    pub indexed_chunks: usize,
    pub todo_stats: TodoStats,
}

pub struct NoteRag {
    config: Config,
    tracker: ChangeTracker,
    todos: TodoStore,
    parser: MarkdownParser,
    chunker: TextChunker,
    index: Box<dyn SemanticIndex>,
}

impl NoteRag {
    /// Open state under `persist_dir` with the local keyword index.
    ///
    /// Failing to open the index is the only fatal construction error;
    /// unreadable hash tables or TODO files start empty.
    pub fn open(config: Config) -> Result<Self> {
        let index = KeywordIndex::load(config.index_dir()).context("Failed to open index")?;
        Self::with_index(config, Box::new(index))
    }

    /// Build the context around an existing index backend
    pub fn with_index(config: Config, index: Box<dyn SemanticIndex>) -> Result<Self> {
        config.validate()?;

        let tracker = ChangeTracker::open(
            &config.paths.data_dir,
            config.document_hash_path(),
            config.chunk_hash_path(),
        )
        .with_exclude_patterns(config.paths.exclude_patterns.clone());
        let todos = TodoStore::load(config.todo_path());
        let parser = MarkdownParser::new(config.section_policy())
            .with_fallback(config.chunking.chunk_size, config.chunking.chunk_overlap);
        let chunker = config.chunker()?;

        tracing::debug!(
            "Opened note-rag over {} (state in {})",
            config.paths.data_dir.display(),
            config.paths.persist_dir.display()
        );

        Ok(Self {
            config,
            tracker,
            todos,
            parser,
            chunker,
            index,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn todo_store(&self) -> &TodoStore {
        &self.todos
    }

    /// Mutable TODO list; persist with [`TodoStore::save`]
    pub fn todo_store_mut(&mut self) -> &mut TodoStore {
        &mut self.todos
    }

    pub fn index(&self) -> &dyn SemanticIndex {
        self.index.as_ref()
    }

    /// Notes under the data root
    pub fn note_files(&self) -> Result<Vec<NoteFile>> {
        self.tracker.walker().walk()
    }

    /// Parse and chunk a note's content under its relative path
    pub fn chunk_content(&self, doc_id: &str, content: &str) -> Result<Vec<Chunk>> {
        let sections = self.parser.parse(content);
        Ok(self.chunker.chunk_document(doc_id, &sections)?)
    }

    /// Read, parse and chunk one note
    pub fn document_chunks(&self, file: &NoteFile) -> Result<Vec<Chunk>> {
        let content = read_note(&file.path)?;
        self.chunk_content(&file.relative_path, &content)
    }

    /// Ranked chunks for a free-text query; `top_k` defaults to `search.top_k`
    pub fn query(&self, text: &str, top_k: Option<usize>) -> Result<Vec<RetrievedChunk>> {
        let top_k = top_k.unwrap_or(self.config.search.top_k);
        let results = self.index.retrieve(text, top_k)?;
        tracing::debug!("Query '{}' returned {} chunks", text, results.len());
        Ok(results)
    }

    pub fn system_info(&self) -> Result<SystemInfo> {
        let total_documents = match self.note_files() {
            Ok(files) => files.len(),
            Err(e) => {
                tracing::warn!("Could not list notes: {:#}", e);
                0
            }
        };

        Ok(SystemInfo {
            data_dir: self.config.paths.data_dir.clone(),
            persist_dir: self.config.paths.persist_dir.clone(),
            total_documents,
            tracked_documents: self.tracker.document_count(),
            tracked_chunks: self.tracker.chunk_count(),
            indexed_chunks: self.index.len()?,
            todo_stats: self.todos.stats(crate::todo::now().date()),
        })
    }

    /// Ask the index to drop chunk ids; a backend without point deletes is
    /// tolerated and the stale entries are only logged
    fn remove_from_index(&mut self, chunk_ids: &[String]) -> Result<usize> {
        if chunk_ids.is_empty() {
            return Ok(0);
        }

        match self.index.remove(chunk_ids) {
            Ok(removed) => {
                tracing::debug!("Removed {} chunks from the index", removed);
                Ok(removed)
            }
            Err(e) if is_delete_unsupported(&e) => {
                tracing::info!(
                    "Index cannot delete entries; {} stale chunks remain until a full rebuild",
                    chunk_ids.len()
                );
                for id in chunk_ids {
                    tracing::debug!("Stale chunk: {}", id);
                }
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }
}
