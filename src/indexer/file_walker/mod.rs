//! Discovery of Markdown notes under the data root

use crate::error::IndexingError;
use crate::glob_utils::{compile_patterns, matches_any_matcher};
use crate::paths::relative_path;
use anyhow::{Context, Result};
use globset::GlobMatcher;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions treated as notes
pub const NOTE_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// A note found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    pub path: PathBuf,
    /// Forward-slash path relative to the walk root, used as `doc_id`
    pub relative_path: String,
}

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) exclude_patterns: Vec<String>,
    matchers: Vec<GlobMatcher>,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude_patterns: Vec::new(),
            matchers: Vec::new(),
        }
    }

    /// Skip notes whose relative path matches any of these globs
    pub fn with_exclude_patterns(mut self, exclude_patterns: Vec<String>) -> Self {
        self.matchers = compile_patterns(&exclude_patterns);
        self.exclude_patterns = exclude_patterns;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and collect every note, sorted by relative path
    pub fn walk(&self) -> Result<Vec<NoteFile>> {
        if !self.root.exists() {
            return Err(IndexingError::DirectoryNotFound(self.root.display().to_string()).into());
        }
        if !self.root.is_dir() {
            return Err(IndexingError::NotADirectory(self.root.display().to_string()).into());
        }

        // Dot-directories (.git, .obsidian, .trash) hold tool state, not notes
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(false)
            .require_git(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .map_err(|e| IndexingError::WalkFailed(e.to_string()))
                .context("Failed to read directory entry")?;
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) || !is_note(path) {
                continue;
            }

            let relative_path = relative_path(&self.root, path);
            if self.is_excluded(&relative_path) {
                tracing::debug!("Skipping excluded note: {}", relative_path);
                continue;
            }

            files.push(NoteFile {
                path: path.to_path_buf(),
                relative_path,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tracing::debug!("Found {} notes under {}", files.len(), self.root.display());
        Ok(files)
    }

    pub(crate) fn is_excluded(&self, relative_path: &str) -> bool {
        matches_any_matcher(relative_path, &self.matchers)
    }
}

/// Whether the path has a Markdown extension (case-insensitive)
pub fn is_note(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| NOTE_EXTENSIONS.iter().any(|n| ext.eq_ignore_ascii_case(n)))
}

/// Read a note as UTF-8
pub fn read_note(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        IndexingError::FileReadFailed {
            file: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
