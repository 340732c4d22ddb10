//! Lexical analysis module.
//!
//! This module contains the lexer (tokenizer) that converts script source
//! into a stream of tokens for the evaluator. It handles:
//!
//! - Buffered UTF-8 decoding with one rune of lookahead
//! - An explicit state machine for lists, symbols, numbers and strings
//! - Token position tracking for error reporting
//! - Running as a producer thread with cancellation at every emission

pub mod context;
pub mod lexer;
pub mod rune_reader;
pub mod tokens;

#[cfg(test)]
mod tests;
