//! Markdown sectionizer.
//!
//! Splits a note into ordered `(header, content, level)` sections using
//! pulldown-cmark to find headings, so `#` lines inside fenced code are not
//! mistaken for headings. Section bodies are sliced from the raw source, which
//! keeps list markers and checkboxes intact for TODO extraction.

use crate::chunker;
use crate::todo::patterns::{self, MarkerKind};
use crate::types::Section;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Header given to body text that precedes the first heading
pub const PREAMBLE_HEADER: &str = "Document";

/// What to do with body text that appears before the first heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreamblePolicy {
    /// Emit it as a level-1 section headed [`PREAMBLE_HEADER`]
    #[default]
    Implicit,
    /// Discard it
    Drop,
}

/// Section emission rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionPolicy {
    /// Keep sections whose body is empty after trimming
    pub keep_empty_sections: bool,
    pub preamble: PreamblePolicy,
}

/// A heading found while scanning for metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingInfo {
    pub level: u8,
    pub text: String,
}

/// A link or image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

/// Summary statistics of one Markdown document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub headers: Vec<HeadingInfo>,
    /// Lines carrying an open action-item marker
    pub todo_count: usize,
    pub code_blocks: usize,
    pub links: Vec<Link>,
    pub images: Vec<Link>,
}

static FRONTMATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
        .expect("frontmatter pattern is valid")
});

struct HeadingSpan {
    start: usize,
    end: usize,
    level: u8,
    text: String,
}

#[derive(Debug, Clone)]
pub struct MarkdownParser {
    policy: SectionPolicy,
    fallback_chunk_size: usize,
    fallback_overlap: usize,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(SectionPolicy::default())
    }
}

impl MarkdownParser {
    pub fn new(policy: SectionPolicy) -> Self {
        Self {
            policy,
            fallback_chunk_size: 800,
            fallback_overlap: 100,
        }
    }

    /// Window used to cut heading-less documents into `Chunk N` sections
    pub fn with_fallback(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.fallback_chunk_size = chunk_size;
        self.fallback_overlap = overlap;
        self
    }

    pub fn policy(&self) -> SectionPolicy {
        self.policy
    }

    /// Parse a document into ordered sections.
    ///
    /// A leading frontmatter block is skipped. A document with content but no
    /// headings becomes fixed-length `Chunk N` sections, so callers never see
    /// an empty result for non-empty input.
    pub fn parse(&self, content: &str) -> Vec<Section> {
        let (_, body) = extract_frontmatter(content);
        let headings = scan_headings(body);

        if headings.is_empty() {
            return self.fallback_sections(body);
        }

        let mut sections = Vec::with_capacity(headings.len() + 1);

        let preamble = trim_body(&body[..headings[0].start]);
        if !preamble.is_empty() && self.policy.preamble == PreamblePolicy::Implicit {
            sections.push(Section::new(PREAMBLE_HEADER, preamble, 1));
        }

        for (i, heading) in headings.iter().enumerate() {
            let next = headings.get(i + 1).map_or(body.len(), |h| h.start);
            let section_body = trim_body(&body[heading.end.min(next)..next]);

            if section_body.is_empty() && !self.policy.keep_empty_sections {
                tracing::debug!("Dropping empty section '{}'", heading.text);
                continue;
            }
            sections.push(Section::new(heading.text.clone(), section_body, heading.level));
        }

        sections
    }

    fn fallback_sections(&self, body: &str) -> Vec<Section> {
        let text = body.trim();
        if text.is_empty() {
            return Vec::new();
        }

        chunker::split_by_length(text, self.fallback_chunk_size, self.fallback_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Section::new(format!("Chunk {}", i + 1), piece, 1))
            .collect()
    }

    pub fn extract_metadata(&self, content: &str) -> DocumentMetadata {
        extract_metadata(content)
    }
}

/// Locate non-empty headings with their source spans
fn scan_headings(content: &str) -> Vec<HeadingSpan> {
    let mut headings = Vec::new();
    let mut current: Option<HeadingSpan> = None;

    for (event, range) in Parser::new_ext(content, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some(HeadingSpan {
                    start: range.start,
                    end: range.end,
                    level: heading_depth(level),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut heading) = current.take() {
                    heading.text = heading.text.trim().to_string();
                    if !heading.text.is_empty() {
                        headings.push(heading);
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = current.as_mut() {
                    heading.text.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(heading) = current.as_mut() {
                    heading.text.push(' ');
                }
            }
            _ => {}
        }
    }

    headings
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn trim_body(raw: &str) -> String {
    raw.trim_start_matches(['\n', '\r']).trim_end().to_string()
}

/// Split a leading `---` block of `key: value` lines from the document
pub fn extract_frontmatter(content: &str) -> (BTreeMap<String, String>, &str) {
    let mut frontmatter = BTreeMap::new();

    let Some(caps) = FRONTMATTER.captures(content) else {
        return (frontmatter, content);
    };

    for line in caps[1].lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                frontmatter.insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    let consumed = caps.get(0).map_or(0, |m| m.end());
    (frontmatter, &content[consumed..])
}

/// Collect headings, open TODO lines, code blocks, links and images
pub fn extract_metadata(content: &str) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::default();

    let mut heading: Option<HeadingInfo> = None;
    let mut link: Option<Link> = None;
    let mut image: Option<Link> = None;

    for event in Parser::new_ext(content, Options::empty()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some(HeadingInfo {
                    level: heading_depth(level),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut info) = heading.take() {
                    info.text = info.text.trim().to_string();
                    metadata.headers.push(info);
                }
            }
            Event::Start(Tag::CodeBlock(_)) => metadata.code_blocks += 1,
            Event::Start(Tag::Link { dest_url, .. }) => {
                link = Some(Link {
                    text: String::new(),
                    url: dest_url.to_string(),
                });
            }
            Event::End(TagEnd::Link) => {
                if let Some(found) = link.take() {
                    metadata.links.push(found);
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                image = Some(Link {
                    text: String::new(),
                    url: dest_url.to_string(),
                });
            }
            Event::End(TagEnd::Image) => {
                if let Some(found) = image.take() {
                    metadata.images.push(found);
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(info) = heading.as_mut() {
                    info.text.push_str(&text);
                }
                if let Some(found) = link.as_mut() {
                    found.text.push_str(&text);
                }
                if let Some(found) = image.as_mut() {
                    found.text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    metadata.todo_count = content
        .lines()
        .filter(|line| {
            patterns::first_marker(line)
                .is_some_and(|m| m.kind != MarkerKind::Checkbox { checked: true })
        })
        .count();

    metadata
}

/// First section whose header matches, ignoring case
pub fn section_by_header<'a>(sections: &'a [Section], header: &str) -> Option<&'a Section> {
    let wanted = header.to_lowercase();
    sections.iter().find(|s| s.header.to_lowercase() == wanted)
}

pub fn sections_by_level(sections: &[Section], level: u8) -> Vec<&Section> {
    sections.iter().filter(|s| s.level == level).collect()
}

/// Render sections back to Markdown, blank-line separated
pub fn flatten_sections(sections: &[Section]) -> String {
    let mut parts = Vec::with_capacity(sections.len() * 2);
    for section in sections {
        parts.push(format!("{} {}", "#".repeat(usize::from(section.level)), section.header));
        if !section.content.trim().is_empty() {
            parts.push(section.content.clone());
        }
    }
    parts.join("\n\n")
}
