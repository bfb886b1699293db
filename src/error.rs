/// Centralized error types for note-rag using thiserror
///
/// Chunking, sectionizing and TODO extraction are pure and never fail; these
/// types cover the I/O edges (state files, notes on disk, the index backend).
use thiserror::Error;

/// Main error type for the note indexing system
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Todo error: {0}")]
    Todo(#[from] TodoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by the semantic index backend
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open index at '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Failed to insert chunk '{chunk_id}': {reason}")]
    InsertFailed { chunk_id: String, reason: String },

    #[error("Failed to search index: {0}")]
    SearchFailed(String),

    #[error("Failed to persist index: {0}")]
    PersistFailed(String),

    #[error("Index backend does not support point deletes")]
    DeleteUnsupported,
}

/// Errors related to discovering and reading notes
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),

    #[error("Failed to read file '{file}': {reason}")]
    FileReadFailed { file: String, reason: String },
}

/// Errors related to chunking parameters
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Duplicate chunk id within one document: {0}")]
    DuplicateChunkId(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to the persisted hash tables
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to load cache from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to save cache to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Failed to hash '{path}': {reason}")]
    HashFailed { path: String, reason: String },
}

/// Errors related to the persisted TODO list
#[derive(Error, Debug)]
pub enum TodoError {
    #[error("Failed to save todos to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Todo not found: {0}")]
    NotFound(String),

    #[error("Invalid status '{0}' (expected pending, in_progress or completed)")]
    InvalidStatus(String),

    #[error("Invalid priority '{0}' (expected high, medium or low)")]
    InvalidPriority(String),
}

// Conversion from anyhow::Error to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}
