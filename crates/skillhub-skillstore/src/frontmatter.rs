//! Frontmatter Support
//!
//! A skill's primary file may open with a header block:
//!
//! ```text
//! ---
//! name: rust-expert
//! description: "Idiomatic Rust guidance,
//!   including error handling"
//! ---
//! # Body shown to the agent
//! ```
//!
//! Only `description` is consumed. The header is stripped before the body is
//! handed to the agent and is never written back.

use skillhub_core::{DESCRIPTION_READ_ERROR, NO_DESCRIPTION, PRIMARY_FILE, PRIMARY_FILE_UPPER};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Header delimiter line
pub const MARKER: &str = "---";

const DESCRIPTION_KEY: &str = "description:";

/// Outcome of reading a skill's description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Found(String),
    NotProvided,
    ReadError,
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Found(text) => f.write_str(text),
            Description::NotProvided => f.write_str(NO_DESCRIPTION),
            Description::ReadError => f.write_str(DESCRIPTION_READ_ERROR),
        }
    }
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Split text into `(header, body)`.
///
/// The text must start with a marker line; the header runs to the next line
/// equal to the marker. Blank lines right after the closing marker are not
/// part of the body.
fn split_normalized(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---\n")?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == MARKER {
            let header = rest[..offset].strip_suffix('\n').unwrap_or(&rest[..offset]);
            let body = rest[offset + line.len()..].trim_start_matches('\n');
            return Some((header, body));
        }
        offset += line.len();
    }

    None
}

/// Return the header block and body of a primary file, if it has a header
pub fn split_frontmatter(text: &str) -> Option<(String, String)> {
    let normalized = normalize_newlines(text);
    split_normalized(&normalized).map(|(header, body)| (header.to_string(), body.to_string()))
}

/// Remove the header block, leaving the body. Text without a header is
/// returned unchanged.
pub fn strip_frontmatter(text: &str) -> String {
    let normalized = normalize_newlines(text);
    match split_normalized(&normalized) {
        Some((_, body)) => body.to_string(),
        None => text.to_string(),
    }
}

/// Extract the description, or the "not provided" sentinel
pub fn extract_description(text: &str) -> String {
    parse_description(text).unwrap_or_else(|| NO_DESCRIPTION.to_string())
}

/// Extract the `description` field from a header block.
///
/// - `description: plain text` yields the line, trimmed
/// - a quoted value may span lines up to its unescaped closing quote; an
///   unterminated quote runs to the end of the header. Whitespace is
///   collapsed so the result is a single line.
/// - an empty value or a `>` / `|` block indicator folds the indented lines
///   that follow
pub fn parse_description(text: &str) -> Option<String> {
    let normalized = normalize_newlines(text);
    let (header, _) = split_normalized(&normalized)?;

    let mut offset = 0;
    for line in header.split_inclusive('\n') {
        if let Some(rest) = line.strip_prefix(DESCRIPTION_KEY) {
            let value = rest.trim_start_matches([' ', '\t']);
            let value_start = offset + line.len() - value.len();
            let following = &header[offset + line.len()..];

            let first_line = value.lines().next().unwrap_or("").trim();
            if first_line.is_empty() || is_block_indicator(first_line) {
                return fold_block(following);
            }
            return scan_scalar(&header[value_start..]);
        }
        offset += line.len();
    }

    debug!("Header block has no description field");
    None
}

/// Read the description of the primary file in `skill_dir`
pub fn read_description(skill_dir: &Path) -> Description {
    let primary = [PRIMARY_FILE, PRIMARY_FILE_UPPER]
        .iter()
        .map(|name| skill_dir.join(name))
        .find(|path| path.exists());

    let Some(path) = primary else {
        return Description::NotProvided;
    };

    match std::fs::read_to_string(&path) {
        Ok(text) => match parse_description(&text) {
            Some(description) => Description::Found(description),
            None => Description::NotProvided,
        },
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            Description::ReadError
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Plain scalar, ends at the newline
    Unquoted,
    /// Inside a quoted scalar; `escaped` is set after a backslash
    InQuote { quote: char, escaped: bool },
    Done,
}

/// Scan one scalar starting at its first character
fn scan_scalar(input: &str) -> Option<String> {
    let mut chars = input.chars().peekable();
    let mut state = match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            ScanState::InQuote {
                quote,
                escaped: false,
            }
        }
        _ => ScanState::Unquoted,
    };
    let quoted = state != ScanState::Unquoted;
    let mut value = String::new();

    for ch in chars {
        state = match state {
            ScanState::Unquoted if ch == '\n' => ScanState::Done,
            ScanState::Unquoted => {
                value.push(ch);
                ScanState::Unquoted
            }
            ScanState::InQuote {
                quote,
                escaped: true,
            } => {
                if ch != '"' && ch != '\'' {
                    value.push('\\');
                }
                value.push(ch);
                ScanState::InQuote {
                    quote,
                    escaped: false,
                }
            }
            ScanState::InQuote { quote, .. } if ch == '\\' => ScanState::InQuote {
                quote,
                escaped: true,
            },
            ScanState::InQuote { quote, .. } if ch == quote => ScanState::Done,
            ScanState::InQuote { quote, .. } => {
                value.push(ch);
                ScanState::InQuote {
                    quote,
                    escaped: false,
                }
            }
            ScanState::Done => ScanState::Done,
        };

        if state == ScanState::Done {
            break;
        }
    }

    if let ScanState::InQuote { escaped: true, .. } = state {
        value.push('\\');
    }

    let value = if quoted {
        collapse_whitespace(&value)
    } else {
        value.trim().to_string()
    };

    (!value.is_empty()).then_some(value)
}

fn is_block_indicator(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some('>' | '|'))
        && chars.all(|c| c == '-' || c == '+' || c.is_ascii_digit())
}

/// Join the indented lines of a block or continued plain scalar
fn fold_block(following: &str) -> Option<String> {
    let lines: Vec<&str> = following
        .lines()
        .take_while(|line| line.trim().is_empty() || line.starts_with([' ', '\t']))
        .collect();

    let value = collapse_whitespace(&lines.join(" "));
    (!value.is_empty()).then_some(value)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
