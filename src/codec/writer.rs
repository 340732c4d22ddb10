use std::{
    any::Any,
    io::{self, Write},
};

use tracing::{debug, trace};

use super::reader::DEFAULT_MAX_DEPTH;
use crate::{
    errors::errors::{Error, ErrorImpl},
    value::value::{is_valid_symbol, Symbol, Value, ValueType},
    Position,
};

/// Encodes typed values into a byte stream.
///
/// The first failure is kept: every later call returns it without touching
/// the underlying writer, so a sequence of writes can be checked once at the
/// end.
pub struct TypedWriter<W: Write> {
    w: W,
    err: Option<Error>,
    total: u64,
    max_depth: usize,
}

impl<W: Write> TypedWriter<W> {
    pub fn new(w: W) -> Self {
        TypedWriter {
            w,
            err: None,
            total: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Rejects lists nested more than `limit` levels deep.
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Bytes written to the underlying writer so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The first error encountered, if any.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn get_ref(&self) -> &W {
        &self.w
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn write_type(&mut self, t: ValueType) -> Result<(), Error> {
        self.sticky(|tw| tw.put_type(t))
    }

    /// Writes a length as a nested integer value.
    pub fn write_size(&mut self, size: usize) -> Result<(), Error> {
        self.sticky(|tw| tw.put_size(size))
    }

    pub fn write_integer(&mut self, v: i64) -> Result<(), Error> {
        self.sticky(|tw| tw.put_integer(v))
    }

    pub fn write_double(&mut self, v: f64) -> Result<(), Error> {
        self.sticky(|tw| tw.put_double(v))
    }

    /// Writes a string; nothing is written unless `v` is valid UTF-8.
    pub fn write_string<S: AsRef<[u8]> + ?Sized>(&mut self, v: &S) -> Result<(), Error> {
        self.sticky(|tw| tw.put_text(ValueType::String, v.as_ref()))
    }

    /// Writes a symbol; nothing is written unless `v` is valid UTF-8 without
    /// whitespace.
    pub fn write_symbol<S: AsRef<[u8]> + ?Sized>(&mut self, v: &S) -> Result<(), Error> {
        self.sticky(|tw| tw.put_text(ValueType::Symbol, v.as_ref()))
    }

    pub fn write_blob(&mut self, v: &[u8]) -> Result<(), Error> {
        self.sticky(|tw| tw.put_blob(v))
    }

    /// Writes a list element by element. A failing element leaves the
    /// elements before it in the stream.
    pub fn write_list(&mut self, values: &[Value]) -> Result<(), Error> {
        self.sticky(|tw| tw.put_list(values, 0))
    }

    pub fn write_value(&mut self, v: &Value) -> Result<(), Error> {
        self.sticky(|tw| tw.put_value(v, 0))
    }

    /// Writes a dynamically typed host value.
    ///
    /// Accepts `Value`, `i64`, `i32`, `f64`, `String`, `&'static str`,
    /// `Symbol`, `Vec<u8>`, `Vec<Value>` and `Vec<Box<dyn Any>>` holding any
    /// of these. Anything else fails with `UnsupportedType`.
    pub fn write_any(&mut self, v: &dyn Any) -> Result<(), Error> {
        self.sticky(|tw| tw.put_any(v, 0))
    }

    fn sticky<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let result = op(self);
        if let Err(err) = &result {
            debug!(error = %err, total = self.total, "typed writer failed");
            self.err = Some(err.clone());
        }
        result
    }

    fn at(&self) -> Position {
        Position::at_offset(self.total)
    }

    /// Writes all of `bytes`, counting every byte the sink accepts even when
    /// a later write fails.
    fn put_raw(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        while !bytes.is_empty() {
            let at = self.at();
            match self.w.write(bytes) {
                Ok(0) => {
                    return Err(Error::io(
                        io::Error::new(io::ErrorKind::WriteZero, "sink accepted no bytes"),
                        at,
                    ))
                }
                Ok(n) => {
                    self.total += n as u64;
                    bytes = &bytes[n..];
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::io(err, at)),
            }
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<(), Error> {
        if depth >= self.max_depth {
            return Err(Error::new(
                ErrorImpl::NestingTooDeep {
                    limit: self.max_depth,
                },
                self.at(),
            ));
        }
        Ok(())
    }

    fn put_type(&mut self, t: ValueType) -> Result<(), Error> {
        self.put_raw(&[t.tag()])
    }

    fn put_size(&mut self, size: usize) -> Result<(), Error> {
        let at = self.at();
        let size = i64::try_from(size).map_err(|_| {
            Error::new(
                ErrorImpl::PayloadTooLarge {
                    size: size as u64,
                    limit: i64::MAX as u64,
                },
                at,
            )
        })?;
        self.put_integer(size)
    }

    fn put_integer(&mut self, v: i64) -> Result<(), Error> {
        self.put_type(ValueType::Integer)?;
        self.put_raw(&v.to_be_bytes())
    }

    fn put_double(&mut self, v: f64) -> Result<(), Error> {
        self.put_type(ValueType::Double)?;
        self.put_raw(&v.to_be_bytes())
    }

    fn put_text(&mut self, t: ValueType, bytes: &[u8]) -> Result<(), Error> {
        let at = self.at();
        let text =
            std::str::from_utf8(bytes).map_err(|_| Error::new(ErrorImpl::InvalidEncoding, at))?;

        if t == ValueType::Symbol && !is_valid_symbol(text) {
            return Err(Error::new(
                ErrorImpl::InvalidSymbol {
                    symbol: text.to_string(),
                },
                at,
            ));
        }

        self.put_type(t)?;
        self.put_size(bytes.len())?;
        self.put_raw(bytes)
    }

    fn put_blob(&mut self, v: &[u8]) -> Result<(), Error> {
        self.put_type(ValueType::Blob)?;
        self.put_size(v.len())?;
        self.put_raw(v)
    }

    fn put_list(&mut self, values: &[Value], depth: usize) -> Result<(), Error> {
        self.check_depth(depth)?;
        self.put_type(ValueType::List)?;
        self.put_size(values.len())?;
        for v in values {
            self.put_value(v, depth + 1)?;
        }
        Ok(())
    }

    fn put_value(&mut self, v: &Value, depth: usize) -> Result<(), Error> {
        trace!(value_type = %v.value_type(), offset = self.total, "writing value");

        match v {
            Value::List(items) => self.put_list(items, depth),
            Value::Integer(v) => self.put_integer(*v),
            Value::Double(v) => self.put_double(*v),
            Value::String(v) => self.put_text(ValueType::String, v.as_bytes()),
            Value::Symbol(v) => self.put_text(ValueType::Symbol, v.as_str().as_bytes()),
            Value::Blob(v) => self.put_blob(v),
        }
    }

    fn put_any(&mut self, v: &dyn Any, depth: usize) -> Result<(), Error> {
        if let Some(v) = v.downcast_ref::<Value>() {
            return self.put_value(v, depth);
        }
        if let Some(v) = v.downcast_ref::<i64>() {
            return self.put_integer(*v);
        }
        if let Some(v) = v.downcast_ref::<i32>() {
            return self.put_integer(i64::from(*v));
        }
        if let Some(v) = v.downcast_ref::<f64>() {
            return self.put_double(*v);
        }
        if let Some(v) = v.downcast_ref::<String>() {
            return self.put_text(ValueType::String, v.as_bytes());
        }
        if let Some(v) = v.downcast_ref::<&'static str>() {
            return self.put_text(ValueType::String, v.as_bytes());
        }
        if let Some(v) = v.downcast_ref::<Symbol>() {
            return self.put_text(ValueType::Symbol, v.as_str().as_bytes());
        }
        if let Some(v) = v.downcast_ref::<Vec<u8>>() {
            return self.put_blob(v);
        }
        if let Some(v) = v.downcast_ref::<Vec<Value>>() {
            return self.put_list(v, depth);
        }
        if let Some(items) = v.downcast_ref::<Vec<Box<dyn Any>>>() {
            self.check_depth(depth)?;
            self.put_type(ValueType::List)?;
            self.put_size(items.len())?;
            for item in items {
                self.put_any(&**item, depth + 1)?;
            }
            return Ok(());
        }

        Err(Error::new(ErrorImpl::UnsupportedType, self.at()))
    }
}

/// Raw bytes pass straight through, sharing the sticky error and the byte
/// count with the typed writes.
impl<W: Write> Write for TypedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sticky(|tw| tw.put_raw(buf))
            .map(|()| buf.len())
            .map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(err) = &self.err {
            return Err(io::Error::other(err.clone()));
        }
        self.w.flush()
    }
}
