//! Per-character style extraction from ANSI escape sequences.
//!
//! Build step output routinely contains SGR color codes. The viewer strips
//! the escape bytes from the display text and exposes the styling as spans
//! over the stripped text, so the host can map each span to whatever its
//! rendering layer uses for classes. Computation is deferred until a line
//! is actually rendered; the manager caches results per chunk.

/// Style attributes active over a span of display text.
///
/// Colors are the 16 base ANSI colors (0-7 normal, 8-15 bright); anything
/// fancier in the input (256-color, truecolor) is stripped but not styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub fg: Option<u8>,
    pub bg: Option<u8>,
    pub bold: bool,
    pub underline: bool,
}

impl SpanStyle {
    pub fn is_plain(&self) -> bool {
        *self == SpanStyle::default()
    }
}

/// A styled region of a line's display text, `[start, end)` byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleSpan {
    pub start: usize,
    pub end: usize,
    pub style: SpanStyle,
}

/// A line with escape bytes removed and styling lifted into spans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledLine {
    pub text: String,
    pub spans: Vec<StyleSpan>,
}

/// Strip ANSI escape sequences from `raw` and record SGR styling as spans.
///
/// Non-SGR CSI sequences and other escapes are dropped from the display
/// text and contribute no span. Unterminated escapes at end of line are
/// dropped as well.
pub fn parse_ansi_line(raw: &str) -> StyledLine {
    let mut text = String::with_capacity(raw.len());
    let mut spans = Vec::new();
    let mut style = SpanStyle::default();
    let mut span_start = 0usize;

    let close_span = |text: &String, spans: &mut Vec<StyleSpan>, span_start: &mut usize, style: SpanStyle| {
        if !style.is_plain() && *span_start < text.len() {
            spans.push(StyleSpan {
                start: *span_start,
                end: text.len(),
                style,
            });
        }
        *span_start = text.len();
    };

    let mut chars = raw.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        if ch != '\x1b' {
            text.push(ch);
            continue;
        }
        // Escape sequence. Only CSI ... 'm' (SGR) affects styling.
        match chars.peek() {
            Some(&(_, '[')) => {
                chars.next();
                let mut params = String::new();
                let mut terminator = None;
                for (_, c) in chars.by_ref() {
                    if c.is_ascii_digit() || c == ';' || c == ':' || c == '?' {
                        params.push(c);
                    } else {
                        terminator = Some(c);
                        break;
                    }
                }
                if terminator == Some('m') {
                    close_span(&text, &mut spans, &mut span_start, style);
                    apply_sgr(&mut style, &params);
                }
            }
            // Lone ESC or a non-CSI escape: swallow the next char if any.
            Some(_) => {
                chars.next();
            }
            None => {}
        }
    }
    close_span(&text, &mut spans, &mut span_start, style);

    StyledLine { text, spans }
}

fn apply_sgr(style: &mut SpanStyle, params: &str) {
    let mut codes = params.split(';').map(|p| p.parse::<u16>().unwrap_or(0));
    while let Some(code) = codes.next() {
        match code {
            0 => *style = SpanStyle::default(),
            1 => style.bold = true,
            4 => style.underline = true,
            22 => style.bold = false,
            24 => style.underline = false,
            30..=37 => style.fg = Some((code - 30) as u8),
            39 => style.fg = None,
            40..=47 => style.bg = Some((code - 40) as u8),
            49 => style.bg = None,
            90..=97 => style.fg = Some((code - 90 + 8) as u8),
            100..=107 => style.bg = Some((code - 100 + 8) as u8),
            // 256-color / truecolor: consume the arguments, apply nothing.
            38 | 48 => match codes.next() {
                Some(5) => {
                    codes.next();
                }
                Some(2) => {
                    codes.next();
                    codes.next();
                    codes.next();
                }
                _ => {}
            },
            _ => {}
        }
    }
}
