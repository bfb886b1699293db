//! Persistent TODO list backed by a single JSON file.
//!
//! Mutations only touch memory; callers flush with [`TodoStore::save`].

use super::{now, Priority, TodoItem, TodoStatus};
use crate::error::TodoError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Source file/section recorded for items created by hand
pub const MANUAL_SOURCE: &str = "manual";

/// Partial update applied by [`TodoStore::update_todo`]
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub content: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
}

/// Counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

#[derive(Debug)]
pub struct TodoStore {
    path: PathBuf,
    todos: Vec<TodoItem>,
}

impl TodoStore {
    /// Load the list at `path`; a missing or unreadable file yields an empty list
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let todos = Self::read_items(&path);
        Self { path, todos }
    }

    fn read_items(path: &Path) -> Vec<TodoItem> {
        if !path.exists() {
            tracing::debug!("Todo file not found at {:?}, starting empty", path);
            return Vec::new();
        }

        let parsed = fs::read_to_string(path)
            .context("Failed to read todo file")
            .and_then(|content| {
                serde_json::from_str::<Vec<TodoItem>>(&content).context("Failed to parse todo file")
            });

        match parsed {
            Ok(items) => {
                tracing::info!("Loaded {} todos from {:?}", items.len(), path);
                items
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable todo file {:?}: {:#}", path, e);
                Vec::new()
            }
        }
    }

    /// Write the list as pretty JSON
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create todo directory")?;
        }

        let content =
            serde_json::to_string_pretty(&self.todos).context("Failed to serialize todos")?;
        fs::write(&self.path, content).map_err(|e| TodoError::SaveFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Saved {} todos to {:?}", self.todos.len(), self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All items, or only those with `status`
    pub fn todos(&self, status: Option<TodoStatus>) -> Vec<&TodoItem> {
        self.todos
            .iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Create an item by hand; bypasses extraction and gets fresh timestamps
    pub fn add_todo(
        &mut self,
        content: &str,
        priority: Priority,
        source_file: Option<&str>,
        source_section: Option<&str>,
    ) -> TodoItem {
        let item = TodoItem::new(
            content,
            priority,
            source_file.unwrap_or(MANUAL_SOURCE),
            source_section.unwrap_or(MANUAL_SOURCE),
            now(),
        );
        self.todos.push(item.clone());
        item
    }

    /// Apply a partial update; advances `updated_at`
    pub fn update_todo(&mut self, id: &str, update: TodoUpdate) -> Result<&TodoItem, TodoError> {
        let todo = self
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;

        if let Some(content) = update.content {
            todo.content = content;
        }
        if let Some(status) = update.status {
            todo.status = status;
        }
        if let Some(priority) = update.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            todo.due_date = due_date;
        }
        if let Some(tags) = update.tags {
            todo.tags = tags;
        }
        todo.updated_at = now().max(todo.updated_at);

        Ok(todo)
    }

    /// Remove by id; returns whether anything was removed
    pub fn delete_todo(&mut self, id: &str) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        self.todos.len() != before
    }

    /// Group items by the date part of `created_at`
    pub fn aggregate_by_date(&self) -> BTreeMap<NaiveDate, Vec<&TodoItem>> {
        let mut grouped: BTreeMap<NaiveDate, Vec<&TodoItem>> = BTreeMap::new();
        for todo in &self.todos {
            grouped.entry(todo.created_at.date()).or_default().push(todo);
        }
        grouped
    }

    /// Unfinished items whose due date is before `today`
    pub fn overdue_todos(&self, today: NaiveDate) -> Vec<&TodoItem> {
        self.todos
            .iter()
            .filter(|t| t.status != TodoStatus::Completed)
            .filter(|t| t.due_date.is_some_and(|due| due < today))
            .collect()
    }

    pub fn stats(&self, today: NaiveDate) -> TodoStats {
        let mut stats = TodoStats {
            total: self.todos.len(),
            overdue: self.overdue_todos(today).len(),
            ..Default::default()
        };
        for todo in &self.todos {
            match todo.status {
                TodoStatus::Pending => stats.pending += 1,
                TodoStatus::InProgress => stats.in_progress += 1,
                TodoStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }

    /// Carry known history over to freshly extracted items.
    ///
    /// An item matching a stored one (same id, or same source file and
    /// normalized content) keeps the stored `created_at` when that is earlier
    /// and inherits the stored tags. Status is inherited too, except where a
    /// checkbox in the note says otherwise: `[x]` is always completed and
    /// `[ ]` reopens a completed item.
    pub fn preserve_creation_dates(&self, items: &mut [TodoItem]) {
        let by_id: HashMap<&str, &TodoItem> =
            self.todos.iter().map(|t| (t.id.as_str(), t)).collect();
        let by_content: HashMap<(String, String), &TodoItem> = self
            .todos
            .iter()
            .map(|t| ((t.source_file.clone(), t.normalized_content()), t))
            .collect();

        for item in items.iter_mut() {
            let existing = by_id.get(item.id.as_str()).copied().or_else(|| {
                by_content
                    .get(&(item.source_file.clone(), item.normalized_content()))
                    .copied()
            });

            if let Some(existing) = existing {
                if existing.created_at < item.created_at {
                    item.created_at = existing.created_at;
                }
                if item.updated_at < existing.updated_at {
                    item.updated_at = existing.updated_at;
                }
                // An explicit box in the note decides done or not done
                match item.checkbox {
                    Some(true) => {}
                    Some(false) => {
                        if existing.status != TodoStatus::Completed {
                            item.status = existing.status;
                        }
                    }
                    None => {
                        if item.status == TodoStatus::Pending {
                            item.status = existing.status;
                        }
                    }
                }
                for tag in &existing.tags {
                    if !item.tags.contains(tag) {
                        item.tags.push(tag.clone());
                    }
                }
            }
        }
    }

    /// Extract from text with creation dates preserved against the stored list
    pub fn extract_from_text(
        &self,
        text: &str,
        source_file: &str,
        source_section: &str,
    ) -> Vec<TodoItem> {
        let mut items = super::extract_from_text(text, source_file, source_section);
        self.preserve_creation_dates(&mut items);
        items
    }

    /// Append extracted items that are genuinely new.
    ///
    /// An item whose id or normalized content is already stored is not
    /// appended; a same-id item only advances the stored `updated_at`.
    /// Returns the number appended.
    pub fn add_extracted_todos(&mut self, items: Vec<TodoItem>) -> usize {
        let mut ids: HashSet<String> = self.todos.iter().map(|t| t.id.clone()).collect();
        let mut contents: HashSet<String> =
            self.todos.iter().map(|t| t.normalized_content()).collect();
        let mut added = 0;

        for item in items {
            if ids.contains(&item.id) {
                if let Some(existing) = self.todos.iter_mut().find(|t| t.id == item.id)
                    && existing.updated_at < item.updated_at
                {
                    existing.updated_at = item.updated_at;
                }
                continue;
            }
            let key = item.normalized_content();
            if contents.contains(&key) {
                tracing::debug!("Skipping duplicate todo '{}'", item.content);
                continue;
            }

            ids.insert(item.id.clone());
            contents.insert(key);
            self.todos.push(item);
            added += 1;
        }

        added
    }

    /// Full refresh: replace every extracted item with `items`.
    ///
    /// Hand-made items survive; extracted ones keep their history through
    /// [`Self::preserve_creation_dates`].
    pub fn replace_extracted(&mut self, mut items: Vec<TodoItem>) {
        self.preserve_creation_dates(&mut items);
        self.todos.retain(|t| t.source_file == MANUAL_SOURCE);

        let mut contents: HashSet<String> =
            self.todos.iter().map(|t| t.normalized_content()).collect();
        for item in items {
            if contents.insert(item.normalized_content()) {
                self.todos.push(item);
            }
        }
    }

    /// Items as they would be written to disk
    pub fn items(&self) -> &[TodoItem] {
        &self.todos
    }

    #[cfg(test)]
    pub(crate) fn push_raw(&mut self, item: TodoItem) {
        self.todos.push(item);
    }
}
