//! Line lexer.
//!
//! Each input line becomes exactly one [`Token`]. Blank lines and lines whose
//! first non-space character is `#` are comment tokens and keep their raw text.
//! Everything else must be `key: value`, `- key: value` or a keyless list
//! scalar `- value`. Inside a list item the key ends at the first `:` that is
//! followed by a space or the end of the line; elsewhere at the first `:`.
//!
//! The indent of a token is the column of its key. For list items the `- `
//! marker counts as indentation, so `- name: x` has indent 2 and lines up with
//! the `  other: y` entries that continue the same item.

use super::error::ParseError;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

/// One lexed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// 1-based source line
    pub line: usize,
    /// Column of the key, marker included
    pub indent: usize,
    /// Full-line comment or blank line
    pub comment: bool,
    /// Line starts with a `- ` list marker
    pub list_start: bool,
    pub key: String,
    /// Value text, left-trimmed; `#` and following spaces removed when commented
    pub value: String,
    /// Value was written as `# value`
    pub commented: bool,
    /// The raw line
    pub text: String,
}

/// Streaming lexer over the lines of a document.
///
/// Stops after the first error.
pub struct Lexer<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    header: bool,
    failed: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut lines = text.lines().enumerate().peekable();
        let header = matches!(lines.peek(), Some((_, first)) if first.trim_end() == "---");
        if header {
            lines.next();
        }
        Self {
            lines,
            header,
            failed: false,
        }
    }

    /// The document started with a `---` line.
    #[must_use]
    pub const fn has_header(&self) -> bool {
        self.header
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (index, raw) = self.lines.next()?;
        let token = lex_line(raw, index + 1);
        if token.is_err() {
            self.failed = true;
        }
        Some(token)
    }
}

/// Lex a single line.
pub fn lex_line(raw: &str, line: usize) -> Result<Token, ParseError> {
    let leading = raw.len() - raw.trim_start_matches(' ').len();
    let body = &raw[leading..];

    if body.trim().is_empty() || body.trim_start().starts_with('#') {
        return Ok(Token {
            line,
            indent: leading,
            comment: true,
            list_start: false,
            key: String::new(),
            value: String::new(),
            commented: false,
            text: raw.to_string(),
        });
    }

    let (body, list_start) = match body.strip_prefix('-') {
        Some("") => ("", true),
        Some(rest) if rest.starts_with(' ') => {
            let rest = &rest[1..];
            if rest.starts_with(' ') {
                return Err(ParseError::ListMarkerSpacing {
                    line,
                    text: raw.to_string(),
                });
            }
            (rest, true)
        }
        _ => (body, false),
    };
    let indent = if list_start { leading + 2 } else { leading };

    let separator = if list_start { key_separator(body) } else { body.find(':') };
    let (key, value) = match separator {
        Some(at) => (body[..at].trim_end(), body[at + 1..].trim_start()),
        None if list_start => ("", body),
        None => {
            return Err(ParseError::MissingSeparator {
                line,
                text: raw.to_string(),
            });
        }
    };

    let (value, commented) = match value.strip_prefix('#') {
        Some(example) => (example.trim_start_matches('#').trim_start(), true),
        None => (value, false),
    };

    Ok(Token {
        line,
        indent,
        comment: false,
        list_start,
        key: key.to_string(),
        value: value.to_string(),
        commented,
        text: raw.to_string(),
    })
}

/// Byte offset of the `:` that ends a list item's key.
///
/// Only a colon followed by whitespace or the end of the line counts, so
/// `- http://host/x` stays a keyless scalar.
fn key_separator(body: &str) -> Option<usize> {
    body.match_indices(':')
        .map(|(at, _)| at)
        .find(|&at| body[at + 1..].chars().next().is_none_or(char::is_whitespace))
}
