//! Action-item mining from note text.
//!
//! Extraction is a pure scan that returns candidate [`TodoItem`]s; merging them
//! into the persisted list is a separate step owned by [`TodoStore`].

mod due_date;
pub mod patterns;
mod store;

pub use due_date::extract_due_date;
pub use patterns::{MarkerKind, MarkerMatch};
pub use store::{MANUAL_SOURCE, TodoStats, TodoStore, TodoUpdate};

use crate::error::TodoError;
use crate::types::Chunk;
use chrono::{Local, NaiveDateTime};
use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Extracted content shorter than this (in chars, after trimming) is noise
pub const MIN_CONTENT_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        })
    }
}

impl FromStr for TodoStatus {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TodoStatus::Pending),
            "in_progress" | "in-progress" => Ok(TodoStatus::InProgress),
            "completed" | "done" => Ok(TodoStatus::Completed),
            other => Err(TodoError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(TodoError::InvalidPriority(other.to_string())),
        }
    }
}

/// A single action item, persisted as one object in `todos.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// First 8 hex chars of md5(`source_file:source_section:content`)
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
    pub priority: Priority,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub source_file: String,
    pub source_section: String,
    #[serde(default)]
    pub due_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_chunk_ids: Vec<String>,
    /// Checkbox state the item was extracted from; never persisted
    #[serde(skip)]
    pub checkbox: Option<bool>,
}

impl TodoItem {
    /// Build an item with a location-derived id and `created_at == updated_at == now`
    pub fn new(
        content: impl Into<String>,
        priority: Priority,
        source_file: impl Into<String>,
        source_section: impl Into<String>,
        now: NaiveDateTime,
    ) -> Self {
        let content = content.into();
        let source_file = source_file.into();
        let source_section = source_section.into();
        Self {
            id: todo_id(&source_file, &source_section, &content),
            content,
            status: TodoStatus::Pending,
            priority,
            created_at: now,
            updated_at: now,
            source_file,
            source_section,
            due_date: None,
            tags: Vec::new(),
            related_chunk_ids: Vec::new(),
            checkbox: None,
        }
    }

    /// Take the status an explicit checkbox states
    fn mark_checkbox(&mut self, checked: bool) {
        self.checkbox = Some(checked);
        self.status = if checked {
            TodoStatus::Completed
        } else {
            TodoStatus::Pending
        };
    }

    /// Content after dedup normalization
    pub fn normalized_content(&self) -> String {
        normalize_content(&self.content)
    }
}

/// Stable item id derived from its location and exact text
pub fn todo_id(source_file: &str, source_section: &str, content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{}:{}:{}", source_file, source_section, content).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

/// Current local wall-clock time, the timestamp format stored in `todos.json`
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Extract action items from free text using the broad pattern set
pub fn extract_from_text(text: &str, source_file: &str, source_section: &str) -> Vec<TodoItem> {
    extract_from_text_at(text, source_file, source_section, now())
}

/// [`extract_from_text`] with an explicit clock; due dates resolve against `now.date()`.
///
/// Every pattern is applied and the matches unioned; matches that normalize
/// to the same text (e.g. `- [ ] TODO: x` hit by both the checkbox and the
/// keyword pattern) yield one item, the first pattern's, with the status the
/// checkbox states.
pub fn extract_from_text_at(
    text: &str,
    source_file: &str,
    source_section: &str,
    now: NaiveDateTime,
) -> Vec<TodoItem> {
    let mut items: Vec<TodoItem> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for found in patterns::find_markers(text, true) {
        let content = found.content.trim();
        if content.chars().count() < MIN_CONTENT_CHARS {
            continue;
        }
        let key = normalize_content(content);
        if key.is_empty() {
            continue;
        }
        if let Some(&idx) = seen.get(&key) {
            if let MarkerKind::Checkbox { checked } = found.kind {
                items[idx].mark_checkbox(checked);
            }
            continue;
        }

        let mut item = TodoItem::new(
            content,
            patterns::infer_priority(content),
            source_file,
            source_section,
            now,
        );
        if let MarkerKind::Checkbox { checked } = found.kind {
            item.mark_checkbox(checked);
        }
        item.due_date = extract_due_date(content, now.date());

        seen.insert(key, items.len());
        items.push(item);
    }

    items
}

/// Turn a TODO-classified chunk into an item linked back to the chunk
pub fn extract_from_chunk(
    chunk: &Chunk,
    source_section: &str,
    now: NaiveDateTime,
) -> Option<TodoItem> {
    if !chunk.metadata.has_todo {
        return None;
    }
    let content = chunk.metadata.todo_content.as_deref()?.trim();
    if content.chars().count() < MIN_CONTENT_CHARS {
        return None;
    }

    let priority = chunk
        .metadata
        .todo_priority
        .unwrap_or_else(|| patterns::infer_priority(content));
    let mut item = TodoItem::new(
        content,
        priority,
        &chunk.metadata.doc_id,
        source_section,
        now,
    );
    let body = patterns::strip_heading_lines(&chunk.text);
    if let Some(MarkerKind::Checkbox { checked }) = patterns::first_marker(body).map(|m| m.kind) {
        item.mark_checkbox(checked);
    }
    item.due_date = extract_due_date(content, now.date());
    item.related_chunk_ids.push(chunk.id.clone());
    Some(item)
}

static CHECKBOX_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+][ \t]*)?\[[ xX]\][ \t]*").expect("checkbox prefix pattern is valid")
});

static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+][ \t]+|[・•][ \t]*|\d+[.)][ \t]+)")
        .expect("list prefix pattern is valid")
});

static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:TODO|FIXME|BUG|HACK|NOTE|XXX)\b[ \t]*:?[ \t]*")
        .expect("label prefix pattern is valid")
});

static TRAILING_PUNCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[。、！？．，!?.;:…]+$").expect("trailing punctuation pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\u{3000}]+").expect("whitespace pattern is valid"));

/// Strip one leading list or checkbox marker, leaving the item text
pub fn strip_list_marker(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(m) = CHECKBOX_PREFIX.find(trimmed) {
        return trimmed[m.end()..].trim();
    }
    match LIST_PREFIX.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

/// Canonical form used to decide whether two items are the same task.
///
/// Repeatedly strips list/checkbox markers and a leading marker label (so
/// compound prefixes like `- [ ] TODO:` disappear), drops trailing sentence
/// punctuation, collapses whitespace (full-width included) and lowercases.
pub fn normalize_content(content: &str) -> String {
    let mut current = WHITESPACE.replace_all(content, " ").trim().to_string();

    for _ in 0..8 {
        let mut next = current.clone();
        next = CHECKBOX_PREFIX.replace(&next, "").trim().to_string();
        next = LIST_PREFIX.replace(&next, "").trim().to_string();
        next = LABEL_PREFIX.replace(&next, "").trim().to_string();
        next = TRAILING_PUNCT.replace(&next, "").trim().to_string();
        if next == current {
            break;
        }
        current = next;
    }

    current.to_lowercase()
}

/// Merge two extraction passes without duplicates.
///
/// Items are equal when their normalized content is equal, regardless of id.
/// Primary items (chunk-sourced) keep their attributes; the survivor takes the
/// earliest `created_at` across all colliding items, and is completed when
/// any of them is.
pub fn deduplicate(primary: Vec<TodoItem>, secondary: Vec<TodoItem>) -> Vec<TodoItem> {
    let mut merged: Vec<TodoItem> = Vec::with_capacity(primary.len() + secondary.len());
    let mut by_content: HashMap<String, usize> = HashMap::new();

    for item in primary.into_iter().chain(secondary) {
        let key = item.normalized_content();
        match by_content.get(&key) {
            Some(&idx) => {
                let survivor = &mut merged[idx];
                if item.created_at < survivor.created_at {
                    survivor.created_at = item.created_at;
                }
                if survivor.due_date.is_none() {
                    survivor.due_date = item.due_date;
                }
                if item.status == TodoStatus::Completed {
                    survivor.status = TodoStatus::Completed;
                    survivor.checkbox = item.checkbox.or(survivor.checkbox);
                } else if survivor.checkbox.is_none() {
                    survivor.checkbox = item.checkbox;
                }
                for chunk_id in item.related_chunk_ids {
                    if !survivor.related_chunk_ids.contains(&chunk_id) {
                        survivor.related_chunk_ids.push(chunk_id);
                    }
                }
            }
            None => {
                by_content.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests;
