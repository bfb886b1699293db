/// Configuration system for note-rag
///
/// Supports loading from multiple sources with priority:
/// Environment variables > Config file > Defaults
use crate::chunker::TextChunker;
use crate::error::{ConfigError, RagError};
use crate::markdown::{PreamblePolicy, SectionPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Where notes live and where state is written
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Sectionizer policies
    #[serde(default)]
    pub sections: SectionsConfig,

    #[serde(default)]
    pub todo: TodoConfig,

    /// Hash table file names
    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Root of the note tree
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for hash tables, the TODO list and the index
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    /// Globs (relative to `data_dir`) of notes that are never indexed
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive fixed-length chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Give every TODO line and bullet its own chunk
    #[serde(default = "default_todo_boundaries")]
    pub todo_boundaries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SectionsConfig {
    /// Keep headings that have no body
    #[serde(default)]
    pub keep_empty_sections: bool,

    /// Text before the first heading: "implicit" or "drop"
    #[serde(default)]
    pub preamble: PreamblePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoConfig {
    /// TODO list file name inside `persist_dir`
    #[serde(default = "default_todo_file")]
    pub todo_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    #[serde(default = "default_document_hash_file")]
    pub document_hash_file: String,

    #[serde(default = "default_chunk_hash_file")]
    pub chunk_hash_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Default number of chunks returned by a query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_todo_boundaries() -> bool {
    true
}

fn default_todo_file() -> String {
    "todos.json".to_string()
}

fn default_document_hash_file() -> String {
    "document_hashes.json".to_string()
}

fn default_chunk_hash_file() -> String {
    "chunk_hashes.json".to_string()
}

fn default_top_k() -> usize {
    5
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist_dir: default_persist_dir(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            todo_boundaries: default_todo_boundaries(),
        }
    }
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            todo_file: default_todo_file(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            document_hash_file: default_document_hash_file(),
            chunk_hash_file: default_chunk_hash_file(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Config {
    /// Config rooted at explicit data and state directories, other values default
    pub fn with_dirs(data_dir: impl Into<PathBuf>, persist_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.paths.data_dir = data_dir.into();
        config.paths.persist_dir = persist_dir.into();
        config
    }

    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.search.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.top_k".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        for (key, value) in [
            ("todo.todo_file", &self.todo.todo_file),
            ("tracker.document_hash_file", &self.tracker.document_hash_file),
            ("tracker.chunk_hash_file", &self.tracker.chunk_hash_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must not be empty".to_string(),
                }
                .into());
            }
        }

        // Allowed: the fixed-length splitter still advances by at least one char
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            tracing::warn!(
                "chunking.chunk_overlap ({}) >= chunking.chunk_size ({}); chunks will overlap heavily",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("NOTE_RAG_DATA_DIR")
            && !path.is_empty()
        {
            self.paths.data_dir = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("NOTE_RAG_PERSIST_DIR")
            && !path.is_empty()
        {
            self.paths.persist_dir = PathBuf::from(path);
        }

        if let Ok(size) = std::env::var("NOTE_RAG_CHUNK_SIZE")
            && let Ok(size) = size.parse()
        {
            self.chunking.chunk_size = size;
        }

        if let Ok(overlap) = std::env::var("NOTE_RAG_CHUNK_OVERLAP")
            && let Ok(overlap) = overlap.parse()
        {
            self.chunking.chunk_overlap = overlap;
        }

        if let Ok(top_k) = std::env::var("NOTE_RAG_TOP_K")
            && let Ok(top_k) = top_k.parse()
        {
            self.search.top_k = top_k;
        }
    }

    /// Defaults, then the config file (explicit or platform default), then environment
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn todo_path(&self) -> PathBuf {
        self.paths.persist_dir.join(&self.todo.todo_file)
    }

    pub fn document_hash_path(&self) -> PathBuf {
        self.paths.persist_dir.join(&self.tracker.document_hash_file)
    }

    pub fn chunk_hash_path(&self) -> PathBuf {
        self.paths.persist_dir.join(&self.tracker.chunk_hash_file)
    }

    /// Directory of the keyword index
    pub fn index_dir(&self) -> PathBuf {
        self.paths.persist_dir.join("index")
    }

    pub fn section_policy(&self) -> SectionPolicy {
        SectionPolicy {
            keep_empty_sections: self.sections.keep_empty_sections,
            preamble: self.sections.preamble,
        }
    }

    /// Chunker built from the `chunking` section
    pub fn chunker(&self) -> Result<TextChunker, RagError> {
        Ok(
            TextChunker::new(self.chunking.chunk_size, self.chunking.chunk_overlap)?
                .with_todo_boundaries(self.chunking.todo_boundaries),
        )
    }
}
