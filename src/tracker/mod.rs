//! Content-hash change detection at document and chunk granularity.
//!
//! Two tables are kept: normalized note path → md5 of the file bytes, and
//! chunk id → md5 of the chunk text. Both live in memory and are written back
//! only by [`ChangeTracker::save`] (except [`ChangeTracker::remove_deleted_chunks`],
//! which flushes immediately). A missing or unreadable table is treated as
//! empty so that the next pass degrades into a full reindex.

use crate::error::CacheError;
use crate::indexer::{FileWalker, NoteFile};
use crate::types::Chunk;
use anyhow::{Context, Result};
use md5::{Digest, Md5};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

type HashTable = BTreeMap<String, String>;

/// md5 of a string as 32 lowercase hex chars
pub fn content_hash(content: &str) -> String {
    bytes_hash(content.as_bytes())
}

/// md5 of a file's bytes
pub fn file_hash(path: &Path) -> Result<String, CacheError> {
    let bytes = fs::read(path).map_err(|e| CacheError::HashFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(bytes_hash(&bytes))
}

fn bytes_hash(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Position of a chunk, recovered from its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLocation {
    pub doc_id: String,
    pub section_id: usize,
    pub chunk_id: usize,
}

/// Inverse of [`crate::types::chunk_id`]. Ids that do not follow the
/// `{doc}:section_{i}:chunk_{j}` shape map to `(id, 0, 0)`.
pub fn parse_chunk_id(id: &str) -> ChunkLocation {
    let parsed = id.rsplit_once(":section_").and_then(|(doc_id, rest)| {
        let (section, chunk) = rest.split_once(":chunk_")?;
        Some(ChunkLocation {
            doc_id: doc_id.to_string(),
            section_id: section.parse().ok()?,
            chunk_id: chunk.parse().ok()?,
        })
    });

    parsed.unwrap_or_else(|| ChunkLocation {
        doc_id: id.to_string(),
        section_id: 0,
        chunk_id: 0,
    })
}

/// A note whose hash differs from (or is absent in) the document table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub file: NoteFile,
    pub hash: String,
    /// Hash recorded before this pass, `None` for unseen notes
    pub previous: Option<String>,
}

/// What [`ChangeTracker::prune_missing_documents`] dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunedDocuments {
    pub documents: Vec<String>,
    pub chunk_ids: Vec<String>,
}

pub struct ChangeTracker {
    data_dir: PathBuf,
    document_path: PathBuf,
    chunk_path: PathBuf,
    exclude_patterns: Vec<String>,
    document_hashes: HashTable,
    chunk_hashes: HashTable,
}

impl ChangeTracker {
    /// Load both tables, treating missing or corrupt files as empty
    pub fn open(
        data_dir: impl Into<PathBuf>,
        document_path: impl Into<PathBuf>,
        chunk_path: impl Into<PathBuf>,
    ) -> Self {
        let document_path = document_path.into();
        let chunk_path = chunk_path.into();
        let document_hashes = load_table(&document_path);
        let chunk_hashes = load_table(&chunk_path);

        tracing::debug!(
            "Loaded {} document hashes and {} chunk hashes",
            document_hashes.len(),
            chunk_hashes.len()
        );

        Self {
            data_dir: data_dir.into(),
            document_path,
            chunk_path,
            exclude_patterns: Vec::new(),
            document_hashes,
            chunk_hashes,
        }
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Walker over the data root with this tracker's exclusions
    pub fn walker(&self) -> FileWalker {
        FileWalker::new(&self.data_dir).with_exclude_patterns(self.exclude_patterns.clone())
    }

    /// Walk the data root and return the relative paths of changed notes,
    /// recording their new hashes in memory
    pub fn check_document_updates(&mut self) -> Result<Vec<String>> {
        let files = self.walker().walk()?;
        Ok(self.check_files(&files))
    }

    /// Same as [`ChangeTracker::check_document_updates`] for an explicit file list
    pub fn check_files(&mut self, files: &[NoteFile]) -> Vec<String> {
        let changes = self.document_changes(files);
        for change in &changes {
            self.record_document(&change.file.relative_path, &change.hash);
        }
        changes.into_iter().map(|c| c.file.relative_path).collect()
    }

    /// Hash every file and report the ones that differ, without touching the table.
    /// Unreadable files are logged and skipped.
    pub fn document_changes(&self, files: &[NoteFile]) -> Vec<DocumentChange> {
        let mut changes = Vec::new();
        for file in files {
            let hash = match file_hash(&file.path) {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.relative_path, e);
                    continue;
                }
            };

            let previous = self.document_hashes.get(&file.relative_path);
            if previous != Some(&hash) {
                changes.push(DocumentChange {
                    file: file.clone(),
                    hash,
                    previous: previous.cloned(),
                });
            }
        }
        changes
    }

    pub fn document_hash(&self, doc_id: &str) -> Option<&str> {
        self.document_hashes.get(doc_id).map(String::as_str)
    }

    pub fn record_document(&mut self, doc_id: &str, hash: &str) {
        self.document_hashes
            .insert(doc_id.to_string(), hash.to_string());
    }

    /// Chunks whose text hash differs from the table; the table is updated
    pub fn check_chunk_updates<'a>(&mut self, chunks: &'a [Chunk]) -> Vec<&'a Chunk> {
        let changed = self.changed_chunks(chunks);
        self.record_chunks(changed.iter().copied());
        changed
    }

    /// Chunks whose text hash differs from the table, without touching it
    pub fn changed_chunks<'a>(&self, chunks: &'a [Chunk]) -> Vec<&'a Chunk> {
        chunks
            .iter()
            .filter(|chunk| {
                self.chunk_hashes.get(&chunk.id).map(String::as_str)
                    != Some(content_hash(&chunk.text).as_str())
            })
            .collect()
    }

    pub fn record_chunks<'a>(&mut self, chunks: impl IntoIterator<Item = &'a Chunk>) {
        for chunk in chunks {
            self.chunk_hashes
                .insert(chunk.id.clone(), content_hash(&chunk.text));
        }
    }

    /// Drop every tracked chunk id absent from `current_chunks` and flush the
    /// chunk table. `current_chunks` must cover the whole data root.
    pub fn remove_deleted_chunks(&mut self, current_chunks: &[Chunk]) -> Result<Vec<String>> {
        let current: BTreeSet<&str> = current_chunks.iter().map(|c| c.id.as_str()).collect();
        let removed: Vec<String> = self
            .chunk_hashes
            .keys()
            .filter(|id| !current.contains(id.as_str()))
            .cloned()
            .collect();

        if removed.is_empty() {
            return Ok(removed);
        }

        for id in &removed {
            self.chunk_hashes.remove(id);
        }
        write_table(&self.chunk_path, &self.chunk_hashes)?;
        tracing::info!("Removed {} deleted chunks from the chunk table", removed.len());
        Ok(removed)
    }

    /// Drop tracked chunk ids of one note that are absent from its current chunks
    pub fn prune_document_chunks(&mut self, doc_id: &str, current_chunks: &[Chunk]) -> Vec<String> {
        let current: BTreeSet<&str> = current_chunks.iter().map(|c| c.id.as_str()).collect();
        let removed: Vec<String> = self
            .chunk_ids_for_document(doc_id)
            .into_iter()
            .filter(|id| !current.contains(id.as_str()))
            .collect();

        for id in &removed {
            self.chunk_hashes.remove(id);
        }
        removed
    }

    /// Forget notes that no longer exist, together with their chunks
    pub fn prune_missing_documents(&mut self, present: &[NoteFile]) -> PrunedDocuments {
        let present: BTreeSet<&str> = present.iter().map(|f| f.relative_path.as_str()).collect();
        let documents: Vec<String> = self
            .document_hashes
            .keys()
            .filter(|doc| !present.contains(doc.as_str()))
            .cloned()
            .collect();

        let mut chunk_ids = Vec::new();
        for doc in &documents {
            self.document_hashes.remove(doc);
            for id in self.chunk_ids_for_document(doc) {
                self.chunk_hashes.remove(&id);
                chunk_ids.push(id);
            }
        }

        PrunedDocuments {
            documents,
            chunk_ids,
        }
    }

    pub fn chunk_ids_for_document(&self, doc_id: &str) -> Vec<String> {
        self.chunk_hashes
            .keys()
            .filter(|id| parse_chunk_id(id).doc_id == doc_id)
            .cloned()
            .collect()
    }

    pub fn document_count(&self) -> usize {
        self.document_hashes.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_hashes.len()
    }

    /// Forget everything (in memory)
    pub fn clear(&mut self) {
        self.document_hashes.clear();
        self.chunk_hashes.clear();
    }

    /// Discard in-memory changes and re-read both tables
    pub fn reload(&mut self) {
        self.document_hashes = load_table(&self.document_path);
        self.chunk_hashes = load_table(&self.chunk_path);
    }

    /// Write both tables to disk
    pub fn save(&self) -> Result<()> {
        write_table(&self.document_path, &self.document_hashes)?;
        write_table(&self.chunk_path, &self.chunk_hashes)?;
        tracing::debug!(
            "Saved {} document hashes and {} chunk hashes",
            self.document_hashes.len(),
            self.chunk_hashes.len()
        );
        Ok(())
    }
}

fn load_table(path: &Path) -> HashTable {
    if !path.exists() {
        tracing::debug!("Hash table {} not found, starting empty", path.display());
        return HashTable::new();
    }

    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));

    match parsed {
        Ok(table) => table,
        Err(reason) => {
            let err = CacheError::LoadFailed {
                path: path.display().to_string(),
                reason,
            };
            tracing::warn!("{}; starting with an empty table", err);
            HashTable::new()
        }
    }
}

fn write_table(path: &Path, table: &HashTable) -> Result<()> {
    let save_failed = |reason: String| CacheError::SaveFailed {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| save_failed(e.to_string()))
            .context("Failed to create state directory")?;
    }

    let content = serde_json::to_string_pretty(table).map_err(|e| save_failed(e.to_string()))?;
    fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
    Ok(())
}
