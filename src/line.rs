//! Log and line type tags, and splitting of raw fetch payloads into lines.
//!
//! Stream logs encode a per-line type in the first character of each line
//! ('o' stdout, 'e' stderr, 'h' header); the tag is stripped before display.
//! The set of line types is fixed, so dispatch is a closed enum rather than
//! string-keyed lookup.

use serde::{Deserialize, Serialize};

/// The kind of log being viewed, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    /// Interleaved stdout/stderr/header lines, each prefixed with a tag char.
    Stream,
    /// Plain text, no per-line tags.
    Text,
    /// Pre-rendered HTML lines, no per-line tags.
    Html,
}

impl LogType {
    /// Whether lines of this log carry a leading one-character type tag.
    pub fn has_line_tags(&self) -> bool {
        matches!(self, LogType::Stream)
    }
}

/// Per-line styling tag. Closed set; unknown stream tags map to `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Stdout,
    Stderr,
    Header,
    Html,
    Plain,
}

impl LineType {
    fn from_tag(tag: char) -> Self {
        match tag {
            'o' => LineType::Stdout,
            'e' => LineType::Stderr,
            'h' => LineType::Header,
            _ => LineType::Plain,
        }
    }

    /// The untagged line type for a given log type.
    fn untagged(log_type: LogType) -> Self {
        match log_type {
            LogType::Html => LineType::Html,
            _ => LineType::Plain,
        }
    }
}

/// One line split out of a raw payload: tag-stripped text plus its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    pub text: &'a str,
    pub line_type: LineType,
}

/// Split a newline-separated payload into typed lines.
///
/// A trailing newline terminates the last line; it does not produce an
/// extra empty line. For stream logs the first character of each line is
/// consumed as the type tag even when the rest of the line is empty.
pub fn split_payload(content: &str, log_type: LogType) -> Vec<RawLine<'_>> {
    let body = content.strip_suffix('\n').unwrap_or(content);
    if body.is_empty() && content.is_empty() {
        return Vec::new();
    }
    body.split('\n')
        .map(|line| {
            if log_type.has_line_tags() {
                let mut chars = line.char_indices();
                match chars.next() {
                    Some((_, tag)) => RawLine {
                        text: &line[tag.len_utf8()..],
                        line_type: LineType::from_tag(tag),
                    },
                    None => RawLine {
                        text: "",
                        line_type: LineType::untagged(log_type),
                    },
                }
            } else {
                RawLine {
                    text: line,
                    line_type: LineType::untagged(log_type),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_stream_payload_strips_tags() {
        let lines = split_payload("oline1\neline2\nhline3\n", LogType::Stream);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], RawLine { text: "line1", line_type: LineType::Stdout });
        assert_eq!(lines[1], RawLine { text: "line2", line_type: LineType::Stderr });
        assert_eq!(lines[2], RawLine { text: "line3", line_type: LineType::Header });
    }

    #[test]
    fn test_trailing_newline_adds_no_line() {
        let with = split_payload("tone\ntwo\n", LogType::Text);
        let without = split_payload("tone\ntwo", LogType::Text);
        assert_eq!(with.len(), 2);
        assert_eq!(without.len(), 2);
        assert_eq!(with, without);
    }

    #[test]
    fn test_empty_payload_has_no_lines() {
        assert!(split_payload("", LogType::Stream).is_empty());
    }

    #[test]
    fn test_tag_only_line_is_empty_text() {
        let lines = split_payload("o\ne\n", LogType::Stream);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "");
        assert_eq!(lines[0].line_type, LineType::Stdout);
        assert_eq!(lines[1].line_type, LineType::Stderr);
    }

    #[test]
    fn test_unknown_tag_maps_to_plain_but_is_stripped() {
        let lines = split_payload("xweird\n", LogType::Stream);
        assert_eq!(lines[0].text, "weird");
        assert_eq!(lines[0].line_type, LineType::Plain);
    }

    #[test]
    fn test_text_log_keeps_first_character() {
        let lines = split_payload("oops not a tag\n", LogType::Text);
        assert_eq!(lines[0].text, "oops not a tag");
        assert_eq!(lines[0].line_type, LineType::Plain);
    }

    #[test]
    fn test_html_log_line_type() {
        let lines = split_payload("<b>hi</b>\n", LogType::Html);
        assert_eq!(lines[0].line_type, LineType::Html);
    }

    #[test]
    fn test_interior_empty_lines_preserved() {
        let lines = split_payload("ta\n\nb\n", LogType::Text);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "");
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&LogType::Stream).unwrap(), "\"stream\"");
        assert_eq!(serde_json::to_string(&LineType::Stderr).unwrap(), "\"stderr\"");
    }
}
