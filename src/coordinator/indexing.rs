use super::{FileState, IndexMode, IndexReport, NoteRag};
use crate::indexer::{NoteFile, read_note};
use crate::tracker::content_hash;
use crate::types::Chunk;
use anyhow::{Context, Result};
use std::time::Instant;

impl NoteRag {
    /// Index the data root on startup: a full build when the index is empty,
    /// otherwise an incremental update
    pub fn sync_on_startup(&mut self) -> Result<IndexReport> {
        if self.index.is_empty()? {
            tracing::info!("Index is empty, building from scratch");
            self.build_full_index()
        } else {
            self.apply_incremental_update()
        }
    }

    /// Rebuild the index and both hash tables from every note.
    ///
    /// Unreadable notes are reported and skipped. An index failure aborts the
    /// pass before anything is persisted.
    pub fn build_full_index(&mut self) -> Result<IndexReport> {
        let start = Instant::now();
        let mut report = IndexReport::new(IndexMode::Full);
        let files = self.note_files().context("Failed to list notes")?;

        self.index.clear()?;
        self.tracker.clear();

        for file in &files {
            let content = match read_note(&file.path) {
                Ok(content) => content,
                Err(e) => {
                    skip_file(&mut report, file, FileState::Unseen, e);
                    continue;
                }
            };
            let chunks = match self.chunk_content(&file.relative_path, &content) {
                Ok(chunks) => chunks,
                Err(e) => {
                    skip_file(&mut report, file, FileState::Unseen, e);
                    continue;
                }
            };

            for chunk in &chunks {
                self.index
                    .insert(chunk)
                    .with_context(|| format!("Failed to index chunk {}", chunk.id))?;
            }
            self.tracker.record_chunks(&chunks);
            self.tracker
                .record_document(&file.relative_path, &content_hash(&content));

            tracing::debug!("Indexed {} ({} chunks)", file.relative_path, chunks.len());
            report.files_indexed += 1;
            report.chunks_created += chunks.len();
            report
                .file_states
                .insert(file.relative_path.clone(), FileState::Indexed);
        }

        self.index.persist()?;
        self.tracker.save()?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Full index: {} notes, {} chunks in {}ms ({} errors)",
            report.files_indexed,
            report.chunks_created,
            report.duration_ms,
            report.errors.len()
        );
        Ok(report)
    }

    /// Reindex only notes whose hash changed, and within them only chunks
    /// whose text changed. Chunks that disappeared are dropped from the chunk
    /// table and, when the backend allows it, from the index.
    pub fn apply_incremental_update(&mut self) -> Result<IndexReport> {
        let start = Instant::now();
        let mut report = IndexReport::new(IndexMode::Incremental);
        let files = self.note_files().context("Failed to list notes")?;
        let changes = self.tracker.document_changes(&files);

        for file in &files {
            if self.tracker.document_hash(&file.relative_path).is_some() {
                report
                    .file_states
                    .insert(file.relative_path.clone(), FileState::Indexed);
            }
        }

        for change in &changes {
            let file = &change.file;
            let failed_state = if change.previous.is_some() {
                FileState::Stale
            } else {
                FileState::Unseen
            };

            let chunks = match self.document_chunks(file) {
                Ok(chunks) => chunks,
                Err(e) => {
                    skip_file(&mut report, file, failed_state, e);
                    continue;
                }
            };

            let changed = self.tracker.changed_chunks(&chunks);
            for chunk in &changed {
                self.index
                    .insert(chunk)
                    .with_context(|| format!("Failed to index chunk {}", chunk.id))?;
            }

            let stale = self
                .tracker
                .prune_document_chunks(&file.relative_path, &chunks);
            self.remove_from_index(&stale)?;

            self.tracker.record_chunks(changed.iter().copied());
            self.tracker.record_document(&file.relative_path, &change.hash);

            tracing::debug!(
                "Reindexed {}: {} changed, {} unchanged, {} removed chunks",
                file.relative_path,
                changed.len(),
                chunks.len() - changed.len(),
                stale.len()
            );
            report.files_indexed += 1;
            report.chunks_created += changed.len();
            report.chunks_skipped += chunks.len() - changed.len();
            report.chunks_removed += stale.len();
            let state = if change.previous.is_some() {
                FileState::Reindexed
            } else {
                FileState::Indexed
            };
            report.file_states.insert(file.relative_path.clone(), state);
        }

        let pruned = self.tracker.prune_missing_documents(&files);
        if !pruned.documents.is_empty() {
            tracing::info!("{} notes were deleted: {:?}", pruned.documents.len(), pruned.documents);
            self.remove_from_index(&pruned.chunk_ids)?;
            report.chunks_removed += pruned.chunk_ids.len();
        }

        self.index.persist()?;
        self.tracker.save()?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Incremental update: {} notes changed, {} chunks indexed, {} unchanged, {} removed in {}ms",
            report.files_indexed,
            report.chunks_created,
            report.chunks_skipped,
            report.chunks_removed,
            report.duration_ms
        );
        Ok(report)
    }

    /// Chunks of `files` whose text differs from the chunk table.
    ///
    /// The table is not updated; [`NoteRag::apply_chunk_updates`] records the
    /// hashes once the chunks are in the index.
    pub fn check_chunk_level_updates(&self, files: &[NoteFile]) -> Vec<Chunk> {
        let mut updated = Vec::new();
        for file in files {
            match self.document_chunks(file) {
                Ok(chunks) => {
                    updated.extend(self.tracker.changed_chunks(&chunks).into_iter().cloned())
                }
                Err(e) => tracing::warn!("Skipping {}: {:#}", file.relative_path, e),
            }
        }
        updated
    }

    /// Insert (replacing by id) the given chunks and record their hashes
    pub fn apply_chunk_updates(&mut self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        for chunk in chunks {
            self.index
                .insert(chunk)
                .with_context(|| format!("Failed to index chunk {}", chunk.id))?;
        }
        self.index.persist()?;

        self.tracker.record_chunks(chunks);
        self.tracker.save()?;

        tracing::info!("Applied {} chunk updates", chunks.len());
        Ok(chunks.len())
    }

    /// Drop tracked chunks that no longer exist in any of `files`.
    ///
    /// `files` must be every note under the data root. If any of them cannot
    /// be chunked the current chunk set is incomplete and nothing is removed.
    pub fn handle_deleted_chunks(&mut self, files: &[NoteFile]) -> Result<Vec<String>> {
        let mut current = Vec::new();
        for file in files {
            match self.document_chunks(file) {
                Ok(chunks) => current.extend(chunks),
                Err(e) => {
                    tracing::warn!(
                        "Not pruning deleted chunks, {} could not be chunked: {:#}",
                        file.relative_path,
                        e
                    );
                    return Ok(Vec::new());
                }
            }
        }

        let removed = self.tracker.remove_deleted_chunks(&current)?;
        if !removed.is_empty() {
            self.remove_from_index(&removed)?;
            self.index.persist()?;
        }
        Ok(removed)
    }
}

fn skip_file(report: &mut IndexReport, file: &NoteFile, state: FileState, err: anyhow::Error) {
    tracing::warn!("Skipping {}: {:#}", file.relative_path, err);
    report
        .errors
        .push(format!("{}: {:#}", file.relative_path, err));
    report.file_states.insert(file.relative_path.clone(), state);
}
