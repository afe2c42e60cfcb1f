//! Tolerant parsing of raw service output.
//!
//! The service is asked for bare JSON but routinely wraps it in markdown
//! fences or surrounds it with prose. Only one thing is trusted: somewhere in
//! the text there is a bracketed fragment approximating the requested shape.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No JSON {0} found in service response")]
    NoFragment(Shape),

    #[error("Malformed JSON in service response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The top-level JSON shape a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array,
    Object,
}

impl Shape {
    fn delimiters(self) -> (char, char) {
        match self {
            Shape::Array => ('[', ']'),
            Shape::Object => ('{', '}'),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Array => f.write_str("array"),
            Shape::Object => f.write_str("object"),
        }
    }
}

/// Removes every triple-backtick fence, including a `json` language tag.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        if let Some(after_tag) = rest.strip_prefix("json") {
            rest = after_tag;
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Greedy match: from the first opening delimiter to the last closing one.
fn greedy_fragment(text: &str, shape: Shape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

/// Balanced match starting at the first opening delimiter, skipping
/// delimiters inside string literals.
fn balanced_fragment(text: &str, shape: Shape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strips fences, locates the outermost fragment of `shape`, and parses it.
///
/// The greedy fragment is tried first. If it does not parse (trailing prose
/// containing a stray bracket, for instance) the balanced fragment starting
/// at the same opening delimiter is tried before giving up.
pub fn parse_fragment(raw: &str, shape: Shape) -> Result<Value, ParseError> {
    let cleaned = strip_code_fences(raw);
    let greedy = greedy_fragment(&cleaned, shape).ok_or(ParseError::NoFragment(shape))?;

    match serde_json::from_str::<Value>(greedy) {
        Ok(value) => Ok(value),
        Err(greedy_err) => match balanced_fragment(&cleaned, shape) {
            Some(balanced) if balanced.len() < greedy.len() => {
                serde_json::from_str(balanced).map_err(ParseError::Malformed)
            }
            _ => Err(ParseError::Malformed(greedy_err)),
        },
    }
}
