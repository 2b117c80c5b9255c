//! Downloaded log chunks.
//!
//! A chunk owns a contiguous half-open `[first_line, last_line)` range of
//! log lines: tag-stripped text concatenated without separators, per-line
//! type tags, and boundary offsets into the text. The manager keeps chunks
//! sorted by `first_line` and pairwise non-overlapping.

use crate::line::{split_payload, LineType, LogType};
use crate::range::LineRange;

/// A contiguous downloaded range of log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    first_line: u64,
    last_line: u64,
    /// Line texts concatenated, tags stripped, no newline separators.
    text: String,
    line_types: Vec<LineType>,
    /// `line_count + 1` byte offsets into `text`; line `i` spans
    /// `offsets[i]..offsets[i + 1]`.
    line_offsets: Vec<usize>,
}

impl Chunk {
    /// Parse a raw fetch payload starting at absolute line `first_line`.
    pub fn from_payload(first_line: u64, content: &str, log_type: LogType) -> Self {
        let raw_lines = split_payload(content, log_type);
        let mut text = String::with_capacity(content.len());
        let mut line_types = Vec::with_capacity(raw_lines.len());
        let mut line_offsets = Vec::with_capacity(raw_lines.len() + 1);
        line_offsets.push(0);
        for raw in &raw_lines {
            text.push_str(raw.text);
            line_types.push(raw.line_type);
            line_offsets.push(text.len());
        }
        Self {
            first_line,
            last_line: first_line + raw_lines.len() as u64,
            text,
            line_types,
            line_offsets,
        }
    }

    pub fn first_line(&self) -> u64 {
        self.first_line
    }

    pub fn last_line(&self) -> u64 {
        self.last_line
    }

    pub fn range(&self) -> LineRange {
        LineRange::new(self.first_line, self.last_line)
    }

    pub fn line_count(&self) -> u64 {
        self.last_line - self.first_line
    }

    pub fn contains_line(&self, index: u64) -> bool {
        index >= self.first_line && index < self.last_line
    }

    /// Raw (tag-stripped, escapes intact) text of an absolute line index.
    pub fn line_text(&self, index: u64) -> Option<&str> {
        if !self.contains_line(index) {
            return None;
        }
        let i = (index - self.first_line) as usize;
        Some(&self.text[self.line_offsets[i]..self.line_offsets[i + 1]])
    }

    pub fn line_type(&self, index: u64) -> Option<LineType> {
        if !self.contains_line(index) {
            return None;
        }
        Some(self.line_types[(index - self.first_line) as usize])
    }

    /// Iterate `(absolute_index, text, line_type)` over all lines.
    pub fn lines(&self) -> impl Iterator<Item = (u64, &str, LineType)> {
        (0..self.line_types.len()).map(move |i| {
            (
                self.first_line + i as u64,
                &self.text[self.line_offsets[i]..self.line_offsets[i + 1]],
                self.line_types[i],
            )
        })
    }

    /// Append `next`, which must start exactly at `self.last_line`.
    pub fn append(&mut self, next: Chunk) {
        debug_assert_eq!(self.last_line, next.first_line);
        let base = self.text.len();
        self.text.push_str(&next.text);
        self.line_types.extend(next.line_types);
        self.line_offsets
            .extend(next.line_offsets.iter().skip(1).map(|o| o + base));
        self.last_line = next.last_line;
    }
}
