use std::io::{self, BufRead, BufReader, Read};

use tracing::{debug, trace};

use crate::{
    errors::errors::{Error, ErrorImpl},
    value::value::{is_valid_symbol, Symbol, Value, ValueType},
    Position,
};

/// Default bound for a single string, symbol or blob payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Default bound for list nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

// element counts come from the stream, so preallocation is capped
const MAX_LIST_PREALLOC: usize = 1024;

/// Decodes typed values from a byte stream.
///
/// Like [`TypedWriter`](super::writer::TypedWriter) the first error is
/// sticky: once a read fails every later call returns the same error and
/// consumes nothing.
pub struct TypedReader<R: BufRead> {
    r: R,
    err: Option<Error>,
    consumed: u64,
    max_payload_len: usize,
    max_depth: usize,
}

impl<R: Read> TypedReader<BufReader<R>> {
    pub fn from_reader(r: R) -> Self {
        TypedReader::new(BufReader::new(r))
    }
}

impl<R: BufRead> TypedReader<R> {
    pub fn new(r: R) -> Self {
        TypedReader {
            r,
            err: None,
            consumed: 0,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Rejects strings, symbols and blobs longer than `limit` bytes.
    pub fn with_max_payload_len(mut self, limit: usize) -> Self {
        self.max_payload_len = limit;
        self
    }

    /// Rejects lists nested more than `limit` levels deep.
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Bytes consumed from the underlying reader so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The first error encountered, if any.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn into_inner(self) -> R {
        self.r
    }

    /// Returns the type of the next value without consuming it.
    pub fn peek_type(&mut self) -> Result<ValueType, Error> {
        self.sticky(|tr| tr.peek_tag())
    }

    pub fn read_type(&mut self) -> Result<ValueType, Error> {
        self.sticky(|tr| tr.take_type())
    }

    /// Reads a type tag and fails with `UnexpectedType` unless it is `expected`.
    pub fn read_type_as(&mut self, expected: ValueType) -> Result<(), Error> {
        self.sticky(|tr| tr.expect_type(expected))
    }

    /// Reads a length encoded as a nested integer value.
    pub fn read_size(&mut self) -> Result<usize, Error> {
        self.sticky(|tr| tr.take_size())
    }

    pub fn read_integer(&mut self) -> Result<i64, Error> {
        self.sticky(|tr| tr.take_integer())
    }

    pub fn read_double(&mut self) -> Result<f64, Error> {
        self.sticky(|tr| tr.take_double())
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        self.sticky(|tr| tr.take_text(ValueType::String))
    }

    /// Reads a symbol, a UTF-8 string without whitespace.
    pub fn read_symbol(&mut self) -> Result<Symbol, Error> {
        self.sticky(|tr| tr.take_symbol())
    }

    pub fn read_blob(&mut self) -> Result<Vec<u8>, Error> {
        self.sticky(|tr| tr.take_blob())
    }

    pub fn read_list(&mut self) -> Result<Vec<Value>, Error> {
        self.sticky(|tr| tr.take_list(0))
    }

    /// Reads the next value, whatever its type.
    pub fn read_value(&mut self) -> Result<Value, Error> {
        self.sticky(|tr| tr.take_value(0))
    }

    /// Returns up to `n` upcoming raw bytes without consuming them. Fewer
    /// bytes come back when the underlying buffer holds fewer.
    pub fn peek(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        self.sticky(|tr| tr.peek_raw(n))
    }

    fn sticky<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let result = op(self);
        if let Err(err) = &result {
            if !err.is_end_of_input() {
                debug!(error = %err, consumed = self.consumed, "typed reader failed");
            }
            self.err = Some(err.clone());
        }
        result
    }

    fn at(&self) -> Position {
        Position::at_offset(self.consumed)
    }

    /// Next byte without consuming it; `EndOfInput` if there is none.
    fn next_byte(&mut self) -> Result<u8, Error> {
        let at = self.at();
        let first = loop {
            match self.r.fill_buf() {
                Ok(buf) => break buf.first().copied(),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::io(err, at)),
            }
        };

        first.ok_or_else(|| Error::end_of_input(at))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let at = self.at();
        self.r.read_exact(buf).map_err(|err| Error::io(err, at))?;
        self.consumed += buf.len() as u64;
        Ok(())
    }

    fn read_word(&mut self) -> Result<[u8; 8], Error> {
        let mut word = [0u8; 8];
        self.read_bytes(&mut word)?;
        Ok(word)
    }

    fn peek_raw(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        if n == 0 {
            return Ok(Vec::new());
        }

        self.next_byte()?;
        let at = self.at();
        let buf = self.r.fill_buf().map_err(|err| Error::io(err, at))?;
        Ok(buf[..n.min(buf.len())].to_vec())
    }

    fn take_raw(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let at = self.at();
        let n = loop {
            match self.r.read(buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::io(err, at)),
            }
        };
        self.consumed += n as u64;
        Ok(n)
    }

    fn peek_tag(&mut self) -> Result<ValueType, Error> {
        let at = self.at();
        let tag = self.next_byte()?;
        ValueType::from_tag(tag).ok_or_else(|| Error::new(ErrorImpl::InvalidType { tag }, at))
    }

    fn take_type(&mut self) -> Result<ValueType, Error> {
        let at = self.at();
        let tag = self.next_byte()?;
        self.r.consume(1);
        self.consumed += 1;
        ValueType::from_tag(tag).ok_or_else(|| Error::new(ErrorImpl::InvalidType { tag }, at))
    }

    fn expect_type(&mut self, expected: ValueType) -> Result<(), Error> {
        let at = self.at();
        let found = self.take_type()?;
        if found != expected {
            return Err(Error::new(
                ErrorImpl::UnexpectedType { expected, found },
                at,
            ));
        }
        Ok(())
    }

    fn take_integer(&mut self) -> Result<i64, Error> {
        self.expect_type(ValueType::Integer)?;
        Ok(i64::from_be_bytes(self.read_word()?))
    }

    fn take_double(&mut self) -> Result<f64, Error> {
        self.expect_type(ValueType::Double)?;
        Ok(f64::from_be_bytes(self.read_word()?))
    }

    fn take_count(&mut self) -> Result<usize, Error> {
        let at = self.at();
        let size = self.take_integer()?;
        usize::try_from(size).map_err(|_| Error::new(ErrorImpl::InvalidSize { size }, at))
    }

    fn take_size(&mut self) -> Result<usize, Error> {
        let at = self.at();
        let size = self.take_count()?;
        if size > self.max_payload_len {
            return Err(Error::new(
                ErrorImpl::PayloadTooLarge {
                    size: size as u64,
                    limit: self.max_payload_len as u64,
                },
                at,
            ));
        }
        Ok(size)
    }

    fn take_payload(&mut self) -> Result<Vec<u8>, Error> {
        let size = self.take_size()?;
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; size];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    fn take_text(&mut self, t: ValueType) -> Result<String, Error> {
        self.expect_type(t)?;
        let at = self.at();
        let payload = self.take_payload()?;
        String::from_utf8(payload).map_err(|_| Error::new(ErrorImpl::InvalidEncoding, at))
    }

    fn take_symbol(&mut self) -> Result<Symbol, Error> {
        let at = self.at();
        let name = self.take_text(ValueType::Symbol)?;
        if !is_valid_symbol(&name) {
            return Err(Error::new(ErrorImpl::InvalidSymbol { symbol: name }, at));
        }
        Ok(Symbol::new(name))
    }

    fn take_blob(&mut self) -> Result<Vec<u8>, Error> {
        self.expect_type(ValueType::Blob)?;
        self.take_payload()
    }

    fn take_list(&mut self, depth: usize) -> Result<Vec<Value>, Error> {
        if depth >= self.max_depth {
            return Err(Error::new(
                ErrorImpl::NestingTooDeep {
                    limit: self.max_depth,
                },
                self.at(),
            ));
        }

        self.expect_type(ValueType::List)?;
        let count = self.take_count()?;

        let mut items = Vec::with_capacity(count.min(MAX_LIST_PREALLOC));
        for _ in 0..count {
            items.push(self.take_value(depth + 1)?);
        }
        Ok(items)
    }

    fn take_value(&mut self, depth: usize) -> Result<Value, Error> {
        let at = self.at();
        let tag = self.next_byte()?;
        trace!(tag, offset = self.consumed, "reading value");

        match ValueType::from_tag(tag) {
            Some(ValueType::List) => self.take_list(depth).map(Value::List),
            Some(ValueType::Integer) => self.take_integer().map(Value::Integer),
            Some(ValueType::Double) => self.take_double().map(Value::Double),
            Some(ValueType::String) => self.take_text(ValueType::String).map(Value::String),
            Some(ValueType::Symbol) => self.take_symbol().map(Value::Symbol),
            Some(ValueType::Blob) => self.take_blob().map(Value::Blob),
            Some(ValueType::Undefined) | None => {
                Err(Error::new(ErrorImpl::InvalidType { tag }, at))
            }
        }
    }
}

/// Raw bytes pass straight through, sharing the sticky error and the byte
/// count with the typed reads.
impl<R: BufRead> Read for TypedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.sticky(|tr| tr.take_raw(buf)).map_err(io::Error::other)
    }
}
