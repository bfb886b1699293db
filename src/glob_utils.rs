//! Glob pattern matching for excluding notes from indexing

use globset::{Glob, GlobMatcher};

/// Check if a note path matches any of the given glob patterns
///
/// An empty pattern list matches nothing. Patterns are tried against the full
/// path and against every trailing run of path components, so `drafts/**`
/// excludes `drafts/x.md` as well as `work/drafts/x.md`.
///
/// # Examples
///
/// ```
/// use note_rag::glob_utils::matches_any_pattern;
///
/// let patterns = vec!["drafts/**".to_string(), "**/*.tmp.md".to_string()];
/// assert!(matches_any_pattern("drafts/idea.md", &patterns));
/// assert!(matches_any_pattern("work/notes.tmp.md", &patterns));
/// assert!(!matches_any_pattern("work/notes.md", &patterns));
/// ```
pub fn matches_any_pattern(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| match Glob::new(pattern) {
        Ok(glob) => matches_path(path, &glob.compile_matcher()),
        Err(e) => {
            tracing::warn!(
                "Invalid glob pattern '{}', falling back to substring match: {}",
                pattern,
                e
            );
            path.contains(pattern.as_str())
        }
    })
}

/// Compile glob patterns, skipping (and logging) the ones that fail to parse
pub fn compile_patterns(patterns: &[String]) -> Vec<GlobMatcher> {
    patterns
        .iter()
        .filter_map(|pattern| match Glob::new(pattern) {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                tracing::warn!("Skipping invalid glob pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}

/// Check if a path matches any of the precompiled glob matchers
pub fn matches_any_matcher(path: &str, matchers: &[GlobMatcher]) -> bool {
    matchers.iter().any(|matcher| matches_path(path, matcher))
}

fn matches_path(path: &str, matcher: &GlobMatcher) -> bool {
    let path = path.trim_start_matches('/');
    if matcher.is_match(path) {
        return true;
    }

    let parts: Vec<&str> = path.split('/').collect();
    (1..parts.len()).any(|i| matcher.is_match(parts[i..].join("/")))
}
