//! The single TODO pattern table shared by free-text extraction, chunk
//! classification and TODO-aware chunk boundaries.

use super::Priority;
use regex::Regex;
use std::sync::LazyLock;

/// Action-item marker keywords, in match order
pub const MARKERS: [&str; 6] = ["TODO", "FIXME", "BUG", "HACK", "NOTE", "XXX"];

/// What produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// One of [`MARKERS`], stored uppercased
    Keyword(&'static str),
    /// `- [ ]` / `- [x]`
    Checkbox { checked: bool },
    /// `1. item` or `1) item`
    Numbered,
    /// `・item` / `• item`
    Bullet,
}

impl MarkerKind {
    /// Label recorded as `todo_type` in chunk metadata
    pub fn label(&self) -> &'static str {
        match self {
            MarkerKind::Keyword(keyword) => keyword,
            MarkerKind::Checkbox { .. } => "CHECKBOX",
            MarkerKind::Numbered => "NUMBERED",
            MarkerKind::Bullet => "BULLET",
        }
    }
}

/// One match of the pattern table: the marker and its trimmed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    pub kind: MarkerKind,
    pub content: String,
}

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\b(TODO|FIXME|BUG|HACK|NOTE|XXX)\b[ \t]*:?[ \t]*(.+?)[ \t]*$")
        .expect("keyword pattern is valid")
});

static CHECKBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*[-*+][ \t]+\[([ xX])\][ \t]*(.+?)[ \t]*$")
        .expect("checkbox pattern is valid")
});

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+(.+?)[ \t]*$").expect("numbered pattern is valid")
});

static BULLET_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*[・•][ \t]*(.+?)[ \t]*$").expect("bullet pattern is valid")
});

/// A marker at the start of a line, optionally behind a list prefix (`* TODO: x`)
static LINE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(?:(?:[-*+]|\d+[.)])[ \t]+)?(?:TODO|FIXME|BUG|HACK|NOTE|XXX)\b")
        .expect("line keyword pattern is valid")
});

static LINE_CHECKBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*[-*+][ \t]+\[[ xX]\]").expect("line checkbox pattern is valid")
});

static LINE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*[-*+][ \t]+\S").expect("line bullet pattern is valid"));

/// ATX heading line: one to six `#` then whitespace or end of line
static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}(?:[ \t]|$)").expect("heading pattern is valid"));

const URGENT_WORDS: [&str; 4] = ["urgent", "急", "緊急", "asap"];
const LATER_WORDS: [&str; 3] = ["later", "後で", "将来"];

/// Scan `text` with the shared table.
///
/// Keyword markers and checkboxes are always applied; numbered items and
/// `・•` bullets only when `include_list_items` is set. Results are in pattern
/// order, then text order.
pub fn find_markers(text: &str, include_list_items: bool) -> Vec<MarkerMatch> {
    let mut matches = Vec::new();

    for caps in KEYWORD.captures_iter(text) {
        matches.push(MarkerMatch {
            kind: MarkerKind::Keyword(keyword_of(&caps[1])),
            content: caps[2].trim().to_string(),
        });
    }

    for caps in CHECKBOX.captures_iter(text) {
        matches.push(MarkerMatch {
            kind: MarkerKind::Checkbox {
                checked: !caps[1].trim().is_empty(),
            },
            content: caps[2].trim().to_string(),
        });
    }

    if include_list_items {
        for caps in NUMBERED.captures_iter(text) {
            matches.push(MarkerMatch {
                kind: MarkerKind::Numbered,
                content: caps[1].trim().to_string(),
            });
        }
        for caps in BULLET_CHAR.captures_iter(text) {
            matches.push(MarkerMatch {
                kind: MarkerKind::Bullet,
                content: caps[1].trim().to_string(),
            });
        }
    }

    matches
}

/// First keyword or checkbox marker in `text`, if any
pub fn first_marker(text: &str) -> Option<MarkerMatch> {
    let keyword = KEYWORD.captures(text).map(|caps| {
        (
            caps.get(0).map(|m| m.start()).unwrap_or(0),
            MarkerMatch {
                kind: MarkerKind::Keyword(keyword_of(&caps[1])),
                content: caps[2].trim().to_string(),
            },
        )
    });
    let checkbox = CHECKBOX.captures(text).map(|caps| {
        (
            caps.get(0).map(|m| m.start()).unwrap_or(0),
            MarkerMatch {
                kind: MarkerKind::Checkbox {
                    checked: !caps[1].trim().is_empty(),
                },
                content: caps[2].trim().to_string(),
            },
        )
    });

    match (keyword, checkbox) {
        (Some(k), Some(c)) => Some(if c.0 <= k.0 { c.1 } else { k.1 }),
        (Some(k), None) => Some(k.1),
        (None, Some(c)) => Some(c.1),
        (None, None) => None,
    }
}

/// Skip the leading ATX heading lines a section chunk starts with.
///
/// `#tag` words are body text, not headings, and stay in place.
pub fn strip_heading_lines(text: &str) -> &str {
    let mut rest = text.trim_start();
    while HEADING_LINE.is_match(rest) {
        rest = match rest.split_once('\n') {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }
    rest
}

/// Marker keyword a section heading starts with (`TODO: plans` → `TODO`)
pub fn header_marker(header: &str) -> Option<&'static str> {
    let trimmed = header.trim();
    LINE_KEYWORD
        .find(trimmed)
        .map(|m| keyword_of(m.as_str().trim_start_matches(|c: char| !c.is_ascii_alphabetic())))
}

/// Whether a single line must become its own chunk in TODO-aware splitting
pub fn is_boundary_line(line: &str) -> bool {
    LINE_KEYWORD.is_match(line) || LINE_CHECKBOX.is_match(line) || LINE_BULLET.is_match(line)
}

/// Infer priority from urgency/deferral keywords; urgency wins
pub fn infer_priority(text: &str) -> Priority {
    let lowered = text.to_lowercase();
    if URGENT_WORDS.iter().any(|w| lowered.contains(w)) {
        Priority::High
    } else if LATER_WORDS.iter().any(|w| lowered.contains(w)) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

fn keyword_of(raw: &str) -> &'static str {
    let upper = raw.to_uppercase();
    MARKERS
        .iter()
        .copied()
        .find(|m| upper.starts_with(m))
        .unwrap_or("TODO")
}
