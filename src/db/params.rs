//! Named parameter binding.
//!
//! Statements reference parameters as `@name`. Before execution they are rewritten
//! into the positional placeholders of the target database, and the values are
//! collected in placeholder order.

use super::{Parameters, Value};
use crate::error::{BoxError, DriverResult};
use regex::Regex;
use std::sync::OnceLock;

/// Positional placeholder syntax of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `?1`, `?2`, ... (SQLite)
    Question,
}

impl PlaceholderStyle {
    fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Dollar => format!("${index}"),
            Self::Question => format!("?{index}"),
        }
    }
}

/// A statement ready to be sent to a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl BoundStatement {
    /// Rewrites `@name` references in `query` and binds their values.
    ///
    /// A name used more than once maps to the same placeholder. A NULL value is
    /// written as an untyped `NULL` literal instead of a placeholder, so it fits
    /// any column type. Text inside string literals (including `E'...'` and
    /// `$tag$...$tag$` bodies), quoted identifiers and comments is left untouched,
    /// as are `@@` sequences.
    pub fn prepare(
        query: &str,
        parameters: &Parameters,
        style: PlaceholderStyle,
    ) -> DriverResult<Self> {
        let mut sql = String::with_capacity(query.len());
        let mut names: Vec<&str> = Vec::new();
        let mut values = Vec::new();

        let bytes = query.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b'E' | b'e'
                    if bytes.get(i + 1) == Some(&b'\'') && !follows_ident(bytes, i) =>
                {
                    let end = skip_escape_string(bytes, i + 1);
                    sql.push_str(&query[i..end]);
                    i = end;
                }
                b'$' => {
                    let end = dollar_quoted_end(query, i).unwrap_or(i + 1);
                    sql.push_str(&query[i..end]);
                    i = end;
                }
                b'\'' | b'"' => {
                    let end = skip_quoted(bytes, i, c);
                    sql.push_str(&query[i..end]);
                    i = end;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    let end = query[i..].find('\n').map_or(bytes.len(), |n| i + n);
                    sql.push_str(&query[i..end]);
                    i = end;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = query[i + 2..].find("*/").map_or(bytes.len(), |n| i + n + 4);
                    sql.push_str(&query[i..end]);
                    i = end;
                }
                b'@' if bytes.get(i + 1) == Some(&b'@') => {
                    sql.push_str("@@");
                    i += 2;
                }
                b'@' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && is_ident_char(bytes[end]) {
                        end += 1;
                    }
                    let name = &query[start..end];
                    let value = parameters
                        .get(name)
                        .ok_or_else(|| missing_parameter(name))?;
                    if value.is_null() {
                        sql.push_str("NULL");
                    } else {
                        let index = match names.iter().position(|n| *n == name) {
                            Some(pos) => pos + 1,
                            None => {
                                names.push(name);
                                values.push(value.clone());
                                names.len()
                            }
                        };
                        sql.push_str(&style.placeholder(index));
                    }
                    i = end;
                }
                _ => {
                    // Copy the full UTF-8 sequence starting here
                    let len = utf8_len(c);
                    sql.push_str(&query[i..i + len]);
                    i += len;
                }
            }
        }

        Ok(Self { sql, values })
    }
}

/// Returns true when `name` can be referenced as `@name`.
pub fn is_valid_parameter_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
        .is_match(name)
}

fn missing_parameter(name: &str) -> BoxError {
    format!("no value supplied for parameter '@{name}'").into()
}

/// Returns the index just past the closing quote; doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Like [`skip_quoted`] for `E'...'` strings, where a backslash escapes the
/// next byte. `quote_at` is the index of the opening quote.
fn skip_escape_string(bytes: &[u8], quote_at: usize) -> usize {
    let mut i = quote_at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 2,
            b'\'' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Returns the index just past a `$tag$...$tag$` body starting at `start`, or
/// `None` when the `$` does not open one (`$1`, `a$b`).
fn dollar_quoted_end(query: &str, start: usize) -> Option<usize> {
    let bytes = query.as_bytes();
    if follows_ident(bytes, start) {
        return None;
    }
    let mut j = start + 1;
    if bytes.get(j).is_some_and(|b| is_ident_start(*b)) {
        while j < bytes.len() && is_ident_char(bytes[j]) {
            j += 1;
        }
    }
    if bytes.get(j) != Some(&b'$') {
        return None;
    }

    let tag = &query[start..=j];
    let body = j + 1;
    Some(
        query[body..]
            .find(tag)
            .map_or(bytes.len(), |n| body + n + tag.len()),
    )
}

fn follows_ident(bytes: &[u8], i: usize) -> bool {
    i > 0 && (is_ident_char(bytes[i - 1]) || bytes[i - 1] == b'$')
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}
