use std::io::{self, BufRead, BufReader, Read};

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

/// Longest encoded UTF-8 sequence.
pub const MAX_UTF8_LEN: usize = 4;

/// Buffered UTF-8 decoder with one rune of lookahead.
///
/// Bytes are pulled from the underlying reader only as far as needed to
/// decode the next rune, and stay in `lookahead` until consumed.
pub struct RuneReader<R: Read> {
    inner: BufReader<R>,
    lookahead: Vec<u8>,
    position: Position,
}

impl<R: Read> RuneReader<R> {
    pub fn new(input: R) -> Self {
        RuneReader {
            inner: BufReader::new(input),
            lookahead: Vec::with_capacity(MAX_UTF8_LEN),
            position: Position::start(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns the next rune and its encoded width without consuming it.
    pub fn peek_rune(&mut self) -> Result<(char, usize), Error> {
        for width in 1..=MAX_UTF8_LEN {
            if !self.fill(width)? {
                if self.lookahead.is_empty() {
                    return Err(Error::end_of_input(self.position));
                }
                // input ended in the middle of a sequence
                return Err(self.invalid_encoding());
            }

            match std::str::from_utf8(&self.lookahead[..width]) {
                Ok(text) => {
                    if let Some(rune) = text.chars().next() {
                        return Ok((rune, width));
                    }
                }
                Err(err) if err.error_len().is_some() => return Err(self.invalid_encoding()),
                Err(_) => continue,
            }
        }

        Err(self.invalid_encoding())
    }

    /// Discards `n` bytes that were already peeked.
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.lookahead.len());
        let consumed: Vec<u8> = self.lookahead.drain(..n).collect();

        for rune in String::from_utf8_lossy(&consumed).chars() {
            if rune == '\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else {
                self.position.column += 1;
            }
        }
        self.position.offset += n as u64;

        n
    }

    pub fn read_rune(&mut self) -> Result<(char, usize), Error> {
        let (rune, width) = self.peek_rune()?;
        self.consume(width);
        Ok((rune, width))
    }

    /// Makes at least `want` bytes available; `false` on end of input.
    fn fill(&mut self, want: usize) -> Result<bool, Error> {
        while self.lookahead.len() < want {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::io(err, self.position)),
            };

            if available.is_empty() {
                return Ok(false);
            }

            let take = (want - self.lookahead.len()).min(available.len());
            self.lookahead.extend_from_slice(&available[..take]);
            self.inner.consume(take);
        }

        Ok(true)
    }

    fn invalid_encoding(&self) -> Error {
        Error::new(ErrorImpl::InvalidEncoding, self.position)
    }
}
