//! Error types and error handling for the lexer and the codec.
//!
//! This module defines the single error type shared by every component:
//!
//! - Error structures with stream position information
//! - Specific error variants for lexing, decoding and encoding
//! - A coarse `ErrorKind` classification for callers
//! - Helpful error messages and suggestions

pub mod errors;
