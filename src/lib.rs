#![allow(clippy::module_inception)]

use std::fmt::Display;

use crate::errors::errors::{Error, ErrorTip};

pub mod codec;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod value;

extern crate regex;

pub use codec::{reader::TypedReader, writer::TypedWriter};
pub use errors::errors::{CancelCause, ErrorImpl, ErrorKind};
pub use lexer::context::{Canceller, Context};
pub use lexer::lexer::{lex_machine, spawn_lexer, tokenize, TokenStream};
pub use lexer::tokens::{Token, TokenKind};
pub use value::value::{Symbol, Value, ValueType};

/// Location of a rune in a text stream or of a byte in a binary stream.
///
/// `line` and `column` are 1-based and only meaningful for text; they are
/// zero for positions inside an encoded value stream. `offset` is always the
/// 0-based byte offset from the start of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u64,
}

impl Position {
    pub fn null() -> Self {
        Position::default()
    }

    pub fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    pub fn at_offset(offset: u64) -> Self {
        Position {
            line: 0,
            column: 0,
            offset,
        }
    }

    pub fn has_line(&self) -> bool {
        self.line > 0
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_line() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "byte {}", self.offset)
        }
    }
}

/// Returns the 1-based `line` of `source`, without its line terminator.
pub fn get_line(source: &str, line: u32) -> Option<&str> {
    if line == 0 {
        return None;
    }

    source
        .split('\n')
        .nth(line as usize - 1)
        .map(|text| text.strip_suffix('\r').unwrap_or(text))
}


/// Formats `error` as a diagnostic against `source`.
///
/// ```text
/// Error: MissingSeparator (add whitespace between `d` and `(`)
/// -> 2:7
///   |
/// 2 | (c d(e))
///   | ----^
/// ```
pub fn render_error(error: &Error, source: &str) -> String {
    let position = error.get_position();
    let mut out = String::new();

    if let ErrorTip::None = error.get_tip() {
        out.push_str(&format!("Error: {}\n", error.get_error_name()));
    } else {
        out.push_str(&format!(
            "Error: {} ({})\n",
            error.get_error_name(),
            error.get_tip()
        ));
    }
    out.push_str(&format!("-> {}\n", position));

    let Some(line_text) = get_line(source, position.line) else {
        return out;
    };

    let line_string = position.line.to_string();
    let padding = line_string.len() + 2;

    out.push_str(&format!("{:>padding$}\n", "|"));

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(line_text);
    out.push_str(&format!("{} | {}\n", line_string, line_text_removed.trim_end()));

    let column = position.column as usize;
    let arrows = column.saturating_sub(removed_whitespace).max(1);

    out.push_str(&format!("{:>padding$} {:->arrows$}\n", "|", "^"));
    out
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}
