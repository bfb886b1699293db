//! # note-rag - Incremental Markdown Note Indexing
//!
//! Turns a directory of Markdown notes into searchable chunks and a TODO list,
//! and keeps both current without redoing work on every run.
//!
//! ## Overview
//!
//! Notes are split into heading sections, sections into chunks, and chunks are
//! handed to a semantic index. Content hashes at two granularities (whole
//! files and individual chunks) let an update touch only what changed. Action
//! items (`TODO:`, checkboxes, bullets under a `TODO` heading) are mined into a
//! persistent list that keeps each item's original creation date across edits.
//!
//! ## Architecture
//!
//! ```text
//!   notes/*.md
//!       │
//! ┌─────▼──────┐   ┌─────────────┐   ┌──────────────┐
//! │ markdown   │──▶│  chunker    │──▶│ index        │
//! │ (sections) │   │ (+TODO meta)│   │ (Tantivy)    │
//! └────────────┘   └──────┬──────┘   └──────────────┘
//!                         │
//!            ┌────────────┼────────────┐
//!      ┌─────▼─────┐            ┌──────▼─────┐
//!      │ tracker   │            │ todo       │
//!      │ (md5 JSON)│            │ (todos.json)│
//!      └───────────┘            └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`coordinator`]: application context running full and incremental passes
//! - [`markdown`]: heading sectionizer, frontmatter and document metadata
//! - [`chunker`]: cascade and TODO-aware text splitting
//! - [`tracker`]: document and chunk hash tables
//! - [`todo`]: action item extraction, dedup and the persistent store
//! - [`index`]: semantic index interface and the local keyword index
//! - [`indexer`]: note discovery under the data root
//! - [`config`]: configuration with environment variable overrides
//!
//! ## Usage Example
//!
//! ```no_run
//! use note_rag::config::Config;
//! use note_rag::coordinator::NoteRag;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut rag = NoteRag::open(Config::with_dirs("./notes", "./storage"))?;
//!     rag.sync_on_startup()?;
//!
//!     for hit in rag.query("quarterly report", None)? {
//!         println!("{:.2} {}", hit.score, hit.id);
//!     }
//!     Ok(())
//! }
//! ```

/// Fixed-size and TODO-aware chunking
pub mod chunker;

/// Configuration management with environment variable overrides
pub mod config;

/// Application context wiring the components together
pub mod coordinator;

/// Error types and utilities
pub mod error;

/// Glob matching for exclusion patterns
pub mod glob_utils;

/// Semantic index interface and keyword implementation
pub mod index;

/// Discovery and reading of note files
pub mod indexer;

/// Markdown sectionizing and metadata
pub mod markdown;

/// Platform directories and path normalization
pub mod paths;

/// TODO extraction and persistence
pub mod todo;

/// Content hash tables for change detection
pub mod tracker;

/// Sections, chunks and index results
pub mod types;
