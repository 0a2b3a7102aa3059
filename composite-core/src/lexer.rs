// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tokenization helpers shared by [crate::parser], [crate::ops], and
//! [crate::serializer].
//!
//! Operates on `&str` byte slices (the value grammar is ASCII-only) rather
//! than a mutable, NUL-terminated buffer: callers get back indices into the
//! original text instead of an in-place-truncated copy.
//!
//! The three-way [LexResult] is the load-bearing type in this module: a
//! missing *optional* delimiter (e.g. no `:` in a bare path segment) is a
//! [LexResult::NotFound], never a [LexResult::Err]. Collapsing that
//! distinction into `Option<Result<T, E>>` would make it easy for a missing
//! optional token to be mistaken for a malformed one further up the call
//! stack, so it gets its own variant instead.
use crate::error::{CompositeError, Diagnostic};

/// Result of a lexing operation that may legitimately find nothing.
#[derive(Debug)]
pub enum LexResult<T> {
    /// Found `T`, with the index of the first byte following it.
    Found(T, usize),
    /// Not present; the index is unchanged / where the search stopped.
    NotFound(usize),
    /// The input was malformed (unbalanced delimiters, bad quoting, ...).
    Err(CompositeError),
}

impl<T> LexResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(..))
    }
}

/// Scan `text` for `needle` at brace/bracket depth 0, outside of quotes,
/// starting at `from`. Returns the byte index of the match.
///
/// Quoting uses single quotes with a doubled `''` meaning a literal quote
/// character inside the string, matching the value grammar's `qstring`.
pub fn same_level_find(text: &str, from: usize, needle: char) -> LexResult<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut i = from;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if in_quotes {
            if c == '\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                in_quotes = false;
                i += 1;
                continue;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' => in_quotes = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return LexResult::Err(CompositeError::SyntaxError(Diagnostic::new(format!(
                        "unbalanced closing delimiter at byte {i}"
                    ))));
                }
            }
            c if c == needle && depth == 0 => return LexResult::Found(i, i + 1),
            _ => {}
        }

        i += 1;
    }

    if in_quotes {
        return LexResult::Err(CompositeError::SyntaxError(Diagnostic::new(
            "unterminated quoted string",
        )));
    }
    if depth != 0 {
        return LexResult::Err(CompositeError::SyntaxError(Diagnostic::new(
            "unbalanced delimiters",
        )));
    }

    LexResult::NotFound(i)
}

/// Parse a leading `[index]` path segment (array indexing).
pub fn get_index(text: &str) -> LexResult<usize> {
    let text_bytes = text.as_bytes();
    if text_bytes.first() != Some(&b'[') {
        return LexResult::NotFound(0);
    }

    match text.find(']') {
        Some(end) => {
            let inside = &text[1..end];
            match inside.parse::<usize>() {
                Ok(n) => LexResult::Found(n, end + 1),
                Err(_) => LexResult::Err(CompositeError::SyntaxError(Diagnostic::new(format!(
                    "non-numeric array index \"{inside}\""
                )))),
            }
        }
        None => LexResult::Err(CompositeError::SyntaxError(Diagnostic::new(
            "unterminated array index",
        ))),
    }
}

/// Byte offset of the next `->` or `[` in `text`, or `text.len()` if neither
/// appears.
fn next_boundary(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            return i;
        }
        if bytes[i] == b'-' && bytes.get(i + 1) == Some(&b'>') {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// Parse a leading `->name` or bare `name` path segment, stopping at the
/// next `->` or `[`. The leading `->` is optional so this also matches a
/// path's first token, which carries no separator.
pub fn get_name(text: &str) -> LexResult<String> {
    let rest = text.strip_prefix("->").unwrap_or(text);
    let prefix_len = text.len() - rest.len();

    if rest.is_empty() {
        return LexResult::NotFound(prefix_len);
    }

    let end = next_boundary(rest);
    if end == 0 {
        return LexResult::NotFound(prefix_len);
    }

    LexResult::Found(rest[..end].to_string(), prefix_len + end)
}

/// Parse a leading `<digits>:` explicit-index prefix off one array element
/// (`"2:'c'"` → `Found(2, 2)`, leaving `"'c'"` as the remaining value text).
/// A plain positional element (no `:` prefix) is `NotFound`.
pub fn get_element_index(text: &str) -> LexResult<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
        i += 1;
    }

    if i == 0 || bytes.get(i) != Some(&b':') {
        return LexResult::NotFound(0);
    }

    match text[..i].parse::<usize>() {
        Ok(n) => LexResult::Found(n, i + 1),
        Err(_) => LexResult::Err(CompositeError::SyntaxError(Diagnostic::new(format!(
            "non-numeric array index \"{}\"",
            &text[..i]
        )))),
    }
}

/// Verify that every `{`/`[` in `text` has a matching close, outside of
/// quoted regions.
pub fn check_braces(text: &str) -> Result<(), CompositeError> {
    match same_level_find(text, 0, '\u{0}') {
        LexResult::Err(e) => Err(e),
        _ => Ok(()),
    }
}
