use std::{fmt::Display, io, sync::Arc};

use thiserror::Error;

use crate::{value::value::ValueType, Position};

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn end_of_input(position: Position) -> Self {
        Error::new(ErrorImpl::EndOfInput, position)
    }

    pub fn io(error: io::Error, position: Position) -> Self {
        Error::new(ErrorImpl::Io(Arc::new(error)), position)
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self.internal_error, ErrorImpl::EndOfInput)
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.internal_error {
            ErrorImpl::EndOfInput => ErrorKind::EndOfInput,
            ErrorImpl::InvalidEncoding => ErrorKind::InvalidEncoding,
            ErrorImpl::UnexpectedRune { .. }
            | ErrorImpl::MissingSeparator { .. }
            | ErrorImpl::InvalidEscape { .. }
            | ErrorImpl::NewlineInString
            | ErrorImpl::UnterminatedString
            | ErrorImpl::DeadState
            | ErrorImpl::NumberParseError { .. }
            | ErrorImpl::UnexpectedToken { .. } => ErrorKind::Lexical,
            ErrorImpl::InvalidType { .. } => ErrorKind::InvalidType,
            ErrorImpl::UnexpectedType { .. } => ErrorKind::UnexpectedType,
            ErrorImpl::UnsupportedType => ErrorKind::UnsupportedType,
            ErrorImpl::InvalidSymbol { .. }
            | ErrorImpl::InvalidSize { .. }
            | ErrorImpl::PayloadTooLarge { .. }
            | ErrorImpl::NestingTooDeep { .. } => ErrorKind::InvalidValue,
            ErrorImpl::Cancelled { .. } => ErrorKind::Cancelled,
            ErrorImpl::Io(_) => ErrorKind::Io,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::EndOfInput => "EndOfInput",
            ErrorImpl::InvalidEncoding => "InvalidEncoding",
            ErrorImpl::UnexpectedRune { .. } => "UnexpectedRune",
            ErrorImpl::MissingSeparator { .. } => "MissingSeparator",
            ErrorImpl::InvalidEscape { .. } => "InvalidEscape",
            ErrorImpl::NewlineInString => "NewlineInString",
            ErrorImpl::UnterminatedString => "UnterminatedString",
            ErrorImpl::DeadState => "DeadState",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::InvalidType { .. } => "InvalidType",
            ErrorImpl::UnexpectedType { .. } => "UnexpectedType",
            ErrorImpl::UnsupportedType => "UnsupportedType",
            ErrorImpl::InvalidSymbol { .. } => "InvalidSymbol",
            ErrorImpl::InvalidSize { .. } => "InvalidSize",
            ErrorImpl::PayloadTooLarge { .. } => "PayloadTooLarge",
            ErrorImpl::NestingTooDeep { .. } => "NestingTooDeep",
            ErrorImpl::Cancelled { .. } => "Cancelled",
            ErrorImpl::Io(_) => "Io",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::EndOfInput | ErrorImpl::InvalidType { .. } | ErrorImpl::Io(_) => {
                ErrorTip::None
            }
            ErrorImpl::InvalidEncoding => {
                ErrorTip::Suggestion(String::from("Input is not valid UTF-8"))
            }
            ErrorImpl::UnexpectedRune { rune, state } => ErrorTip::Suggestion(format!(
                "Unexpected rune `{}` (U+{:04X}) in {}",
                rune.escape_debug(),
                *rune as u32,
                state
            )),
            ErrorImpl::MissingSeparator { token } => ErrorTip::Suggestion(format!(
                "add whitespace between `{}` and `(`",
                token
            )),
            ErrorImpl::InvalidEscape { rune } => ErrorTip::Suggestion(format!(
                "`\\{}` is not an escape, only `\\\"` and `\\\\` are",
                rune.escape_debug()
            )),
            ErrorImpl::NewlineInString => ErrorTip::Suggestion(String::from(
                "use '`' to encode multiline strings",
            )),
            ErrorImpl::UnterminatedString => ErrorTip::Suggestion(String::from(
                "Input ended before the closing quote",
            )),
            ErrorImpl::DeadState => ErrorTip::Suggestion(String::from(
                "The lexer reached a dead state before the end of input",
            )),
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::UnexpectedToken { token } => {
                ErrorTip::Suggestion(format!("`{}` is not a literal", token))
            }
            ErrorImpl::UnexpectedType { expected, found } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, found
            )),
            ErrorImpl::UnsupportedType => ErrorTip::Suggestion(String::from(
                "Only lists, integers, doubles, strings, symbols and blobs can be encoded",
            )),
            ErrorImpl::InvalidSymbol { symbol } => ErrorTip::Suggestion(format!(
                "Symbol {:?} contains whitespace",
                symbol
            )),
            ErrorImpl::InvalidSize { size } => {
                ErrorTip::Suggestion(format!("Size {} is negative", size))
            }
            ErrorImpl::PayloadTooLarge { size, limit } => ErrorTip::Suggestion(format!(
                "Payload of {} bytes exceeds the limit of {} bytes",
                size, limit
            )),
            ErrorImpl::NestingTooDeep { limit } => ErrorTip::Suggestion(format!(
                "Lists are nested deeper than {} levels",
                limit
            )),
            ErrorImpl::Cancelled { cause } => ErrorTip::Suggestion(cause.to_string()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.internal_error, self.position)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.internal_error {
            ErrorImpl::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EndOfInput,
    InvalidEncoding,
    Lexical,
    InvalidType,
    UnexpectedType,
    UnsupportedType,
    InvalidValue,
    Cancelled,
    Io,
}

/// Why a lexer run stopped before the end of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelCause {
    Cancelled,
    DeadlineExceeded,
    /// The consumer dropped its end of the token stream.
    Disconnected,
}

impl Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelCause::Cancelled => write!(f, "context cancelled"),
            CancelCause::DeadlineExceeded => write!(f, "context deadline exceeded"),
            CancelCause::Disconnected => write!(f, "token consumer disconnected"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("end of input")]
    EndOfInput,
    #[error("not a valid utf8 text stream")]
    InvalidEncoding,
    #[error("unexpected rune {rune:?} in {state}")]
    UnexpectedRune { rune: char, state: &'static str },
    #[error("missing whitespace between {token:?} and (")]
    MissingSeparator { token: String },
    #[error("invalid escape quote {rune:?}")]
    InvalidEscape { rune: char },
    #[error("raw newline inside a quoted string")]
    NewlineInString,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("reached a dead state before end of input or other error")]
    DeadState,
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("invalid type tag {tag}")]
    InvalidType { tag: u8 },
    #[error("unexpected type: expected {expected}, found {found}")]
    UnexpectedType {
        expected: ValueType,
        found: ValueType,
    },
    #[error("cannot encode value of unsupported type")]
    UnsupportedType,
    #[error("symbol {symbol:?} contains whitespace")]
    InvalidSymbol { symbol: String },
    #[error("invalid size {size}")]
    InvalidSize { size: i64 },
    #[error("payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: u64, limit: u64 },
    #[error("lists nested deeper than {limit}")]
    NestingTooDeep { limit: usize },
    #[error("{cause}")]
    Cancelled { cause: CancelCause },
    #[error("i/o error: {0}")]
    Io(Arc<io::Error>),
}
