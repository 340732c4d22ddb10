use std::fmt::Display;

use crate::{
    errors::errors::{Error, ErrorImpl},
    value::value::{Symbol, Value},
    Position,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    ListOpen,
    ListClose,
    Symbol,
    IntNumber,
    DecimalNumber,
    String,
}

impl TokenKind {
    /// The tag name consumers see on the token stream.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::ListOpen => "lopen",
            TokenKind::ListClose => "lclose",
            TokenKind::Symbol => "symbol",
            TokenKind::IntNumber => "int_number",
            TokenKind::DecimalNumber => "decimal_number",
            TokenKind::String => "string",
        }
    }

    pub fn is_literal(self) -> bool {
        !matches!(self, TokenKind::ListOpen | TokenKind::ListClose)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Position is ignored by equality so tokens can be compared by content.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: Position,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Eq for Token {}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}: {}}}", self.kind, self.value)
    }
}

impl Token {
    /// Converts a literal token into the value it denotes.
    pub fn to_value(&self) -> Result<Value, Error> {
        match self.kind {
            TokenKind::ListOpen | TokenKind::ListClose => Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: self.kind.name().to_string(),
                },
                self.position,
            )),
            TokenKind::Symbol => Ok(Value::Symbol(Symbol::new(self.value.clone()))),
            TokenKind::String => Ok(Value::String(self.value.clone())),
            TokenKind::IntNumber => self
                .value
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.number_error()),
            TokenKind::DecimalNumber => self
                .value
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| self.number_error()),
        }
    }

    fn number_error(&self) -> Error {
        Error::new(
            ErrorImpl::NumberParseError {
                token: self.value.clone(),
            },
            self.position,
        )
    }
}
