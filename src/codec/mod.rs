//! Typed binary codec for the value model.
//!
//! Every value starts with a one-byte type tag. Integers and doubles carry
//! 8 big-endian bytes; strings, symbols, blobs and lists carry a length
//! encoded as a nested integer value followed by their content. The
//! stream is self-describing: any sub-value can be re-parsed on its own.
//!
//! Both `TypedReader` and `TypedWriter` keep the first error they hit and
//! return it from every later call.

pub mod reader;
pub mod writer;
