//! Half-open line ranges shared by the windowing and download engines.
//!
//! Every range in this crate is `[start, end)` over absolute line indices.
//! An empty range has `start == end`; callers never observe `start > end`.

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of log line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u64,
    pub end: u64,
}

impl LineRange {
    /// Create a range. A backwards pair collapses to an empty range at `start`.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// The canonical empty range.
    pub fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: u64) -> bool {
        index >= self.start && index < self.end
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_range(&self, other: LineRange) -> bool {
        other.is_empty() || (other.start >= self.start && other.end <= self.end)
    }

    /// True when the ranges share at least one line.
    pub fn overlaps(&self, other: LineRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The shared portion of two ranges (empty when disjoint).
    pub fn intersect(&self, other: LineRange) -> LineRange {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start >= end {
            LineRange::empty()
        } else {
            LineRange { start, end }
        }
    }

    /// Grow the range by `amount` lines on both sides, clamped to `bounds`.
    pub fn expand(&self, amount: u64, bounds: LineRange) -> LineRange {
        LineRange {
            start: self.start.saturating_sub(amount).max(bounds.start),
            end: (self.end + amount).min(bounds.end),
        }
    }

    /// Clamp both endpoints into `bounds`.
    pub fn clamp_to(&self, bounds: LineRange) -> LineRange {
        let start = self.start.clamp(bounds.start, bounds.end);
        let end = self.end.clamp(bounds.start, bounds.end);
        LineRange::new(start, end)
    }

    /// Midpoint, rounded down. Meaningful only for non-empty ranges.
    pub fn midpoint(&self) -> u64 {
        self.start + self.len() / 2
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
