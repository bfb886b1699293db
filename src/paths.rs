/// Platform-specific directories and note path normalization
///
/// Config and data locations come from the `dirs` crate; note paths are keyed
/// by a forward-slash form relative to the data root so that hash tables and
/// chunk ids are identical on every OS.
use std::path::{Component, Path, PathBuf};

const APP_DIR: &str = "note-rag";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Base config directory (`$XDG_CONFIG_HOME`, `~/Library/Application Support`,
    /// `%APPDATA%`)
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {config_dir}/note-rag
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/note-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

/// Forward-slash path of `path` relative to `root`.
///
/// Paths outside `root` fall back to their file name. `.` components are
/// dropped and `..` pops the previous component, so the key does not depend
/// on how the caller spelled the path.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"));
    };

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    parts.join("/")
}
