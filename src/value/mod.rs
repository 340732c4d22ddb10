//! The value model shared by the lexer and the binary codec.
//!
//! A value is one of six kinds: list, integer, double, string, symbol or
//! blob. `ValueType` carries the one-byte wire tag for each kind.

pub mod value;

#[cfg(test)]
mod tests;
