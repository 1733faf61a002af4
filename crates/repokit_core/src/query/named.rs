//! `:name` placeholder rewriting.
//!
//! Caller SQL is never spliced with argument values. Each `:name` becomes one
//! positional `?` (or one per element for list arguments) and the value is
//! appended to the bind list in placeholder order.

use rusqlite::types::Value;
use thiserror::Error;

use super::args::{Arg, Args};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("no argument supplied for placeholder `:{0}`")]
    MissingArgument(String),
    #[error("list argument `:{0}` is empty")]
    EmptyList(String),
    #[error("positional `?` placeholders are not supported; use `:name`")]
    PositionalPlaceholder,
    #[error("offset of page {page} with limit {limit} does not fit in a 64-bit integer")]
    OffsetOverflow { page: i64, limit: i64 },
}

/// SQL with positional placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Rewrites `:name` placeholders in `sql` using `args`.
///
/// Quoted strings, quoted identifiers, comments and `::` sequences are copied
/// unchanged. Arguments not referenced by the SQL are ignored.
pub fn bind_named(sql: &str, args: &Args) -> Result<BoundQuery, BindingError> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                let end = quoted_end(bytes, i, quote);
                out.push_str(&sql[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = sql[i..].find('\n').map_or(bytes.len(), |pos| i + pos);
                out.push_str(&sql[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |pos| i + 2 + pos + 2);
                out.push_str(&sql[i..end]);
                i = end;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                out.push_str("::");
                i += 2;
            }
            b':' if bytes.get(i + 1).is_some_and(|b| is_name_start(*b)) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_name_continue(bytes[end]) {
                    end += 1;
                }
                let name = &sql[start..end];
                bind_argument(name, args, &mut out, &mut values)?;
                i = end;
            }
            b'?' => return Err(BindingError::PositionalPlaceholder),
            _ => {
                let ch_len = utf8_len(bytes[i]);
                out.push_str(&sql[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    Ok(BoundQuery { sql: out, values })
}

fn bind_argument(
    name: &str,
    args: &Args,
    out: &mut String,
    values: &mut Vec<Value>,
) -> Result<(), BindingError> {
    match args.get(name) {
        Some(Arg::Value(value)) => {
            out.push('?');
            values.push(value.clone());
        }
        Some(Arg::List(list)) if list.is_empty() => {
            return Err(BindingError::EmptyList(name.to_string()));
        }
        Some(Arg::List(list)) => {
            let placeholders = vec!["?"; list.len()].join(", ");
            out.push_str(&placeholders);
            values.extend(list.iter().cloned());
        }
        None => return Err(BindingError::MissingArgument(name.to_string())),
    }
    Ok(())
}

// Index just past the closing quote; a doubled quote is an escape.
fn quoted_end(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut i = open + 1;
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

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}
