//! Utility macros.
//!
//! This module defines helper macros used by the lexer and its tests:
//!
//! - `MK_TOKEN!` - Creates a Token instance
//!
//! These macros reduce boilerplate in the lexer implementation.

/// Creates a Token instance.
///
/// # Arguments
///
/// * `$kind` - The TokenKind
/// * `$value` - The token's accumulated text
/// * `$position` - Where the token starts (defaults to `Position::null()`)
///
/// # Example
///
/// ```ignore
/// let token = MK_TOKEN!(TokenKind::IntNumber, "42".to_string(), position);
/// let expected = MK_TOKEN!(TokenKind::ListOpen);
/// ```
#[macro_export]
macro_rules! MK_TOKEN {
    ($kind:expr) => {
        $crate::lexer::tokens::Token {
            kind: $kind,
            value: String::new(),
            position: $crate::Position::null(),
        }
    };
    ($kind:expr, $value:expr) => {
        $crate::lexer::tokens::Token {
            kind: $kind,
            value: String::from($value),
            position: $crate::Position::null(),
        }
    };
    ($kind:expr, $value:expr, $position:expr) => {
        $crate::lexer::tokens::Token {
            kind: $kind,
            value: $value,
            position: $position,
        }
    };
}
