//! Text chunking for note sections.
//!
//! All sizes are counted in chars, never bytes, so multi-byte text is never
//! cut inside a code point. Every strategy is a pure function of its input
//! and parameters, which keeps chunk ids and chunk hashes stable.

use crate::error::ChunkingError;
use crate::todo::patterns;
use crate::todo::{strip_list_marker, Priority};
use crate::types::{chunk_id, Chunk, ChunkKind, ChunkMetadata, Section};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Punctuation a fixed-length window prefers to end on
const WINDOW_BREAKS: [char; 4] = ['。', '！', '？', '\n'];

/// Punctuation that ends a sentence regardless of what follows
const CJK_TERMINATORS: [char; 3] = ['。', '！', '？'];

/// Punctuation that ends a sentence only before whitespace or end of text
const ASCII_TERMINATORS: [char; 3] = ['.', '!', '?'];

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r?\n[ \t]*\r?\n").expect("paragraph break pattern is valid")
});

/// Size statistics over a list of chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub total_characters: usize,
    pub avg_chunk_size: f64,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    todo_boundaries: bool,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            todo_boundaries: true,
        }
    }
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            tracing::warn!(
                "chunk_overlap ({}) >= chunk_size ({}); fixed-length splitting will advance one char at a time",
                chunk_overlap,
                chunk_size
            );
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            todo_boundaries: true,
        })
    }

    /// Toggle the TODO/bullet-aware split used by [`Self::split`]
    pub fn with_todo_boundaries(mut self, enabled: bool) -> Self {
        self.todo_boundaries = enabled;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split with the configured strategy
    pub fn split(&self, text: &str) -> Vec<String> {
        if self.todo_boundaries {
            self.split_with_todo_boundaries(text)
        } else {
            self.smart_split(text)
        }
    }

    /// Paragraphs first, then sentences, then fixed length
    pub fn smart_split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if trimmed.chars().count() <= self.chunk_size {
            return vec![trimmed.to_string()];
        }

        if PARAGRAPH_BREAK.is_match(trimmed) {
            self.split_by_paragraphs(trimmed)
        } else if has_sentence_punctuation(trimmed) {
            self.split_by_sentences(trimmed)
        } else {
            split_by_length(trimmed, self.chunk_size, self.chunk_overlap)
        }
    }

    /// Accumulate blank-line separated paragraphs up to `chunk_size`.
    ///
    /// A paragraph that alone exceeds the limit is split further by
    /// sentences, or by length when it has no sentence punctuation.
    pub fn split_by_paragraphs(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in PARAGRAPH_BREAK.split(text) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            let para_len = paragraph.chars().count();

            if para_len > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                chunks.extend(self.split_oversized(paragraph));
                continue;
            }

            let joined_len = if current.is_empty() {
                para_len
            } else {
                current_len + 2 + para_len
            };

            if joined_len > self.chunk_size {
                chunks.push(std::mem::take(&mut current));
                current.push_str(paragraph);
                current_len = para_len;
            } else {
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(paragraph);
                current_len = joined_len;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Accumulate whole sentences up to `chunk_size`, keeping the original
    /// spacing between them. Oversized sentences fall back to fixed length.
    pub fn split_by_sentences(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for (start, end) in sentence_spans(&chars) {
            if end - start > self.chunk_size {
                if let Some((s, e)) = current.take() {
                    chunks.push(collect(&chars[s..e]));
                }
                let sentence = collect(&chars[start..end]);
                chunks.extend(split_by_length(&sentence, self.chunk_size, self.chunk_overlap));
                continue;
            }

            current = match current {
                Some((s, e)) if end - s > self.chunk_size => {
                    chunks.push(collect(&chars[s..e]));
                    Some((start, end))
                }
                Some((s, _)) => Some((s, end)),
                None => Some((start, end)),
            };
        }

        if let Some((s, e)) = current {
            chunks.push(collect(&chars[s..e]));
        }
        chunks
    }

    /// Give every TODO, checkbox and bullet line its own chunk and smart-split
    /// the text between them
    pub fn split_with_todo_boundaries(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut segment = String::new();

        for line in text.lines() {
            if !patterns::is_boundary_line(line) {
                segment.push_str(line);
                segment.push('\n');
                continue;
            }

            chunks.extend(self.smart_split(&segment));
            segment.clear();

            let item = line.trim_end();
            if item.chars().count() > self.chunk_size {
                chunks.extend(self.smart_split(item));
            } else {
                chunks.push(item.to_string());
            }
        }

        chunks.extend(self.smart_split(&segment));
        chunks
    }

    fn split_oversized(&self, paragraph: &str) -> Vec<String> {
        if has_sentence_punctuation(paragraph) {
            self.split_by_sentences(paragraph)
        } else {
            split_by_length(paragraph, self.chunk_size, self.chunk_overlap)
        }
    }

    /// Chunk one parsed section into indexable chunks with TODO metadata.
    ///
    /// The text split is `"# {header}\n\n{content}"`; chunk ordinals follow
    /// the split output so ids stay stable across runs.
    pub fn chunk_section(&self, doc_id: &str, section_id: usize, section: &Section) -> Vec<Chunk> {
        let pieces = self.split(&section.indexed_text());
        annotate(pieces, doc_id, section_id, Some(&section.header), section.level)
    }

    /// Chunk every section of a document, verifying chunk ids are unique
    pub fn chunk_document(
        &self,
        doc_id: &str,
        sections: &[Section],
    ) -> Result<Vec<Chunk>, ChunkingError> {
        let mut chunks = Vec::new();
        let mut seen = HashSet::new();

        for (section_id, section) in sections.iter().enumerate() {
            for chunk in self.chunk_section(doc_id, section_id, section) {
                if !seen.insert(chunk.id.clone()) {
                    return Err(ChunkingError::DuplicateChunkId(chunk.id));
                }
                chunks.push(chunk);
            }
        }

        Ok(chunks)
    }

    /// Split raw section text and classify each piece for TODO content.
    ///
    /// When `section_header` carries a marker (`TODO: plans`), every piece is
    /// an action item of that marker's type even without its own marker.
    pub fn chunks_with_todo_metadata(
        &self,
        text: &str,
        doc_id: &str,
        section_id: usize,
        section_header: Option<&str>,
    ) -> Vec<Chunk> {
        annotate(self.split(text), doc_id, section_id, section_header, 1)
    }
}

fn annotate(
    pieces: Vec<String>,
    doc_id: &str,
    section_id: usize,
    header: Option<&str>,
    level: u8,
) -> Vec<Chunk> {
    let total_chunks = pieces.len();
    let header_marker = header.and_then(patterns::header_marker);
    let header_priority = header.map(patterns::infer_priority).unwrap_or_default();

    pieces
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(ordinal, text)| {
            let mut metadata = ChunkMetadata {
                doc_id: doc_id.to_string(),
                section_id,
                chunk_id: ordinal,
                header: header.unwrap_or_default().to_string(),
                level,
                total_chunks,
                ..Default::default()
            };

            let body = patterns::strip_heading_lines(&text);
            let classified = match patterns::first_marker(body) {
                Some(found) => Some((found.kind.label(), found.content)),
                None => header_marker
                    .map(|marker| (marker, strip_list_marker(body).to_string()))
                    .filter(|(_, content)| !content.is_empty()),
            };

            if let Some((todo_type, content)) = classified {
                let priority = match patterns::infer_priority(&content) {
                    Priority::Medium => header_priority,
                    inferred => inferred,
                };
                metadata.kind = ChunkKind::Todo;
                metadata.has_todo = true;
                metadata.todo_type = Some(todo_type.to_string());
                metadata.todo_content = Some(content);
                metadata.todo_priority = Some(priority);
            }

            Chunk {
                id: chunk_id(doc_id, section_id, ordinal),
                text,
                metadata,
            }
        })
        .collect()
}

/// Fixed-length split with overlap that always makes progress.
///
/// Each window prefers to end just after the last `。！？` or newline it
/// contains, provided the chunk stays long enough to move the next window
/// forward. The number of windows is capped at `len / max(1, step / 2) + 2`,
/// so pathological parameters (overlap >= chunk_size) still terminate.
pub fn split_by_length(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let min_break_len = overlap + (step / 2).max(1);
    let max_iterations = len / (step / 2).max(1) + 2;

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut iterations = 0;

    while start < len {
        if iterations >= max_iterations {
            tracing::warn!(
                "Fixed-length split hit its iteration cap (text length {}, chunks {})",
                len,
                chunks.len()
            );
            break;
        }
        iterations += 1;

        let mut end = (start + chunk_size).min(len);
        let mut at_break = false;
        if end < len
            && let Some(pos) = chars[start..end].iter().rposition(|c| WINDOW_BREAKS.contains(c))
            && pos + 1 >= min_break_len
        {
            end = start + pos + 1;
            at_break = true;
        }

        let piece = collect(&chars[start..end]);
        if !piece.trim().is_empty() {
            chunks.push(piece);
        }
        if end >= len {
            break;
        }

        let advance = if at_break { 1 } else { step };
        start = end.saturating_sub(overlap).max(start + advance);
    }

    chunks
}

/// Size statistics over split output
pub fn chunk_stats(chunks: &[String]) -> ChunkStats {
    if chunks.is_empty() {
        return ChunkStats::default();
    }

    let sizes: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
    let total: usize = sizes.iter().sum();

    ChunkStats {
        total_chunks: sizes.len(),
        total_characters: total,
        avg_chunk_size: total as f64 / sizes.len() as f64,
        min_chunk_size: sizes.iter().copied().min().unwrap_or(0),
        max_chunk_size: sizes.iter().copied().max().unwrap_or(0),
    }
}

fn has_sentence_punctuation(text: &str) -> bool {
    text.chars()
        .any(|c| CJK_TERMINATORS.contains(&c) || ASCII_TERMINATORS.contains(&c))
}

/// Char ranges of sentences with surrounding whitespace excluded
fn sentence_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < len {
        let c = chars[i];
        let ends_sentence = CJK_TERMINATORS.contains(&c)
            || (ASCII_TERMINATORS.contains(&c) && (i + 1 == len || chars[i + 1].is_whitespace()));

        if ends_sentence {
            let mut end = i + 1;
            while end < len
                && (CJK_TERMINATORS.contains(&chars[end])
                    || ASCII_TERMINATORS.contains(&chars[end]))
            {
                end += 1;
            }
            push_trimmed(chars, start, end, &mut spans);
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }
    push_trimmed(chars, start, len, &mut spans);

    spans
}

fn push_trimmed(chars: &[char], mut start: usize, mut end: usize, spans: &mut Vec<(usize, usize)>) {
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if start < end {
        spans.push((start, end));
    }
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}
