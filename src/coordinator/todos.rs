use super::NoteRag;
use crate::indexer::read_note;
use crate::todo::{self, MANUAL_SOURCE, TodoItem};
use crate::types::Section;
use anyhow::Result;
use chrono::NaiveDateTime;

/// Section label stored on extracted items
pub(crate) fn section_label(section: &Section) -> String {
    format!("{} (Level {})", section.header, section.level)
}

impl NoteRag {
    /// Rebuild every extracted TODO from the notes on disk and persist the list.
    ///
    /// Per section, items carried by TODO chunks take priority over the
    /// free-text scan of the section body. Hand-made items are kept and
    /// re-extracted items keep their original `created_at`. Returns the number
    /// of extracted items now stored.
    pub fn extract_todos_from_documents(&mut self) -> Result<usize> {
        self.extract_todos_at(todo::now())
    }

    pub(crate) fn extract_todos_at(&mut self, now: NaiveDateTime) -> Result<usize> {
        let files = self.note_files()?;
        let mut extracted: Vec<TodoItem> = Vec::new();

        for file in &files {
            let content = match read_note(&file.path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping {} for TODO extraction: {:#}", file.relative_path, e);
                    continue;
                }
            };

            let before = extracted.len();
            for (section_id, section) in self.parser.parse(&content).iter().enumerate() {
                extracted.extend(self.section_todos(&file.relative_path, section_id, section, now));
            }
            tracing::debug!(
                "Extracted {} TODOs from {}",
                extracted.len() - before,
                file.relative_path
            );
        }

        self.todos.replace_extracted(extracted);
        self.todos.save()?;

        let count = self
            .todos
            .items()
            .iter()
            .filter(|item| item.source_file != MANUAL_SOURCE)
            .count();
        tracing::info!("Extracted {} TODOs from {} notes", count, files.len());
        Ok(count)
    }

    fn section_todos(
        &self,
        doc_id: &str,
        section_id: usize,
        section: &Section,
        now: NaiveDateTime,
    ) -> Vec<TodoItem> {
        let label = section_label(section);

        let chunk_todos: Vec<TodoItem> = self
            .chunker
            .chunk_section(doc_id, section_id, section)
            .iter()
            .filter_map(|chunk| todo::extract_from_chunk(chunk, &label, now))
            .collect();
        let text_todos = todo::extract_from_text_at(&section.content, doc_id, &label, now);

        todo::deduplicate(chunk_todos, text_todos)
    }
}
