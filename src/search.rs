//! Search within the downloaded portion of a log.
//!
//! Matching runs over the display text of every downloaded line (escape
//! bytes stripped), so results line up with what the user sees. The result
//! count deliberately covers only downloaded chunks — undownloaded regions
//! are not fetched just to count matches, so the total under-reports on a
//! partially downloaded log.

use crate::chunk::Chunk;
use crate::style::parse_ansi_line;
use regex::{Regex, RegexBuilder};

/// Location of a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Absolute line index.
    pub line: u64,
    /// Byte offset of the match start within the display text.
    pub column: usize,
}

/// Search parameters plus results over currently downloaded content.
#[derive(Debug, Default)]
pub struct LogSearch {
    search_string: String,
    case_sensitive: bool,
    use_regex: bool,
    results: Vec<SearchResult>,
    current: Option<usize>,
}

impl LogSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_string(&self) -> &str {
        &self.search_string
    }

    pub fn is_active(&self) -> bool {
        !self.search_string.is_empty()
    }

    /// Total matches in the downloaded text. Does not imply full-log
    /// coverage.
    pub fn total_result_count(&self) -> usize {
        self.results.len()
    }

    /// Index of the current result within the result list.
    pub fn current_result_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_result(&self) -> Option<SearchResult> {
        self.current.map(|i| self.results[i])
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Set the pattern. Returns true when it changed (caller rescans).
    pub fn set_search_string(&mut self, search_string: &str) -> bool {
        if self.search_string == search_string {
            return false;
        }
        self.search_string = search_string.to_string();
        true
    }

    pub fn set_case_sensitivity(&mut self, case_sensitive: bool) -> bool {
        if self.case_sensitive == case_sensitive {
            return false;
        }
        self.case_sensitive = case_sensitive;
        true
    }

    pub fn set_use_regex(&mut self, use_regex: bool) -> bool {
        if self.use_regex == use_regex {
            return false;
        }
        self.use_regex = use_regex;
        true
    }

    pub fn set_next_result(&mut self) {
        if self.results.is_empty() {
            return;
        }
        self.current = Some(match self.current {
            Some(i) if i + 1 < self.results.len() => i + 1,
            _ => 0,
        });
    }

    pub fn set_prev_result(&mut self) {
        if self.results.is_empty() {
            return;
        }
        self.current = Some(match self.current {
            Some(i) if i > 0 => i - 1,
            _ => self.results.len() - 1,
        });
    }

    /// Rescan downloaded content.
    ///
    /// `reset_cursor` distinguishes parameter changes (cursor returns to
    /// the first match) from content growth (cursor index is clamped into
    /// the new result list).
    pub fn recompute(&mut self, chunks: &[Chunk], reset_cursor: bool) {
        self.results.clear();
        if let Some(matcher) = self.build_matcher() {
            for chunk in chunks {
                for (index, raw, _) in chunk.lines() {
                    let display = parse_ansi_line(raw).text;
                    for m in matcher.find_iter(&display) {
                        self.results.push(SearchResult {
                            line: index,
                            column: m.start(),
                        });
                    }
                }
            }
        }

        self.current = if self.results.is_empty() {
            None
        } else if reset_cursor {
            Some(0)
        } else {
            Some(self.current.unwrap_or(0).min(self.results.len() - 1))
        };
    }

    /// An invalid regex pattern yields no matcher (and so zero results);
    /// the host updates the pattern per keystroke and transient garbage is
    /// normal.
    fn build_matcher(&self) -> Option<Regex> {
        if self.search_string.is_empty() {
            return None;
        }
        let pattern = if self.use_regex {
            self.search_string.clone()
        } else {
            regex::escape(&self.search_string)
        };
        match RegexBuilder::new(&pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
        {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::debug!("unusable search pattern: {e}");
                None
            }
        }
    }
}
