use std::{
    io::Read,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam::channel::{self, select, Receiver, Sender};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::{
    errors::errors::{CancelCause, Error, ErrorImpl},
    Position, MK_TOKEN,
};

use super::{
    context::Context,
    rune_reader::RuneReader,
    tokens::{Token, TokenKind},
};

lazy_static! {
    // letters, marks, numbers, punctuation and symbols outside ASCII
    static ref SYMBOL_RUNE: Regex = Regex::new(r"^[\p{L}\p{M}\p{N}\p{P}\p{S}]$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Symbol,
    Number,
    Decimal,
    MaybeNumber,
    QuotedString,
    EscapeString,
    MultilineString,
}

type Step = Result<Option<State>, Error>;

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Initial => "initial state",
            State::Symbol => "symbol",
            State::Number => "number",
            State::Decimal => "decimal number",
            State::MaybeNumber => "negative number",
            State::QuotedString => "quoted string",
            State::EscapeString => "escape sequence",
            State::MultilineString => "multiline string",
        }
    }

    fn step<R: Read>(self, e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
        match self {
            State::Initial => initial_state(e, rr),
            State::Symbol => symbol_state(e, rr),
            State::Number => number_state(e, rr),
            State::Decimal => decimal_state(e, rr),
            State::MaybeNumber => maybe_number_state(e, rr),
            State::QuotedString => quoted_string_state(e, rr),
            State::EscapeString => escape_string_state(e, rr),
            State::MultilineString => multiline_string_state(e, rr),
        }
    }
}

/// Owns the pending token text and hands finished tokens to the consumer.
struct Emitter<'a> {
    ctx: &'a Context,
    deadline: Receiver<Instant>,
    out: Sender<Token>,
    acc: String,
    start: Position,
    emitted: usize,
}

impl<'a> Emitter<'a> {
    fn new(ctx: &'a Context, out: Sender<Token>) -> Self {
        let deadline = match ctx.deadline() {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        };

        Emitter {
            ctx,
            deadline,
            out,
            acc: String::new(),
            start: Position::start(),
            emitted: 0,
        }
    }

    fn mark(&mut self, position: Position) {
        self.start = position;
    }

    fn push(&mut self, rune: char) {
        self.acc.push(rune);
    }

    fn pending(&self) -> &str {
        &self.acc
    }

    /// Blocks until the consumer takes the token or the context fires.
    fn emit(&mut self, kind: TokenKind) -> Result<(), Error> {
        let token = MK_TOKEN!(kind, std::mem::take(&mut self.acc), self.start);

        if let Some(cause) = self.ctx.err() {
            return Err(self.cancelled(cause));
        }

        trace!(token = %token, position = %token.position, "emitting token");

        let done = self.ctx.done();
        let sent = select! {
            send(self.out, token) -> res => res.map_err(|_| CancelCause::Disconnected),
            recv(done) -> _ => Err(CancelCause::Cancelled),
            recv(self.deadline) -> _ => Err(CancelCause::DeadlineExceeded),
        };

        match sent {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(cause) => Err(self.cancelled(cause)),
        }
    }

    fn cancelled(&self, cause: CancelCause) -> Error {
        Error::new(ErrorImpl::Cancelled { cause }, self.start)
    }
}

/// Runs the lexer over `input`, sending every token on `out`.
///
/// Returns `Ok(())` when the input is exhausted. The sender is dropped on
/// return, which closes the token stream for the consumer.
pub fn lex_machine<R: Read>(ctx: &Context, out: Sender<Token>, input: R) -> Result<(), Error> {
    let mut rr = RuneReader::new(input);
    let mut e = Emitter::new(ctx, out);
    let mut state = Some(State::Initial);

    debug!("lexer started");

    while let Some(current) = state {
        match current.step(&mut e, &mut rr) {
            Ok(next) => state = next,
            Err(err) if err.is_end_of_input() => {
                debug!(tokens = e.emitted, "lexer reached end of input");
                return Ok(());
            }
            Err(err) => {
                debug!(error = %err, state = current.name(), tokens = e.emitted, "lexer stopped");
                return Err(err);
            }
        }
    }

    Err(Error::new(ErrorImpl::DeadState, rr.position()))
}

/// Tokens produced by a lexer running on its own thread.
pub struct TokenStream {
    tokens: Receiver<Token>,
    producer: JoinHandle<Result<(), Error>>,
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.tokens.recv().ok()
    }
}

impl TokenStream {
    /// Waits for the lexer thread and returns how its run ended.
    ///
    /// Tokens not yet received are dropped; if the lexer was still blocked on
    /// an emission it stops with a `Disconnected` cancellation.
    pub fn finish(self) -> Result<(), Error> {
        let TokenStream { tokens, producer } = self;
        drop(tokens);

        match producer.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Starts a lexer over `input` on a new thread.
pub fn spawn_lexer<R>(ctx: Context, input: R) -> Result<TokenStream, Error>
where
    R: Read + Send + 'static,
{
    let (out, tokens) = channel::bounded(0);
    let producer = thread::Builder::new()
        .name("lexer".to_string())
        .spawn(move || lex_machine(&ctx, out, input))
        .map_err(|err| Error::io(err, Position::null()))?;

    Ok(TokenStream { tokens, producer })
}

/// Lexes a complete source text and collects its tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let ctx = Context::background();
    let (out, tokens) = channel::bounded(0);

    thread::scope(|scope| {
        let producer = scope.spawn(|| lex_machine(&ctx, out, source.as_bytes()));
        let collected: Vec<Token> = tokens.iter().collect();

        match producer.join() {
            Ok(result) => result.map(|()| collected),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

fn is_symbol_rune(rune: char) -> bool {
    if rune.is_ascii() {
        return rune.is_ascii_alphanumeric() || rune.is_ascii_punctuation();
    }

    let mut buf = [0u8; 4];
    SYMBOL_RUNE.is_match(rune.encode_utf8(&mut buf))
}

fn unexpected(rune: char, state: State, at: Position) -> Error {
    Error::new(
        ErrorImpl::UnexpectedRune {
            rune,
            state: state.name(),
        },
        at,
    )
}

/// Peeks the next rune, emitting the pending `kind` token at end of input.
fn peek_or_flush<R: Read>(
    e: &mut Emitter,
    rr: &mut RuneReader<R>,
    kind: TokenKind,
) -> Result<(char, usize), Error> {
    match rr.peek_rune() {
        Err(err) if err.is_end_of_input() => {
            e.emit(kind)?;
            Err(err)
        }
        other => other,
    }
}

/// Peeks the next rune inside a string literal, where end of input is fatal.
fn peek_in_string<R: Read>(e: &Emitter, rr: &mut RuneReader<R>) -> Result<(char, usize), Error> {
    rr.peek_rune().map_err(|err| {
        if err.is_end_of_input() {
            Error::new(ErrorImpl::UnterminatedString, e.start)
        } else {
            err
        }
    })
}

/// Ends the pending `kind` token on a `)` and emits the close.
fn close_after<R: Read>(
    e: &mut Emitter,
    rr: &mut RuneReader<R>,
    kind: TokenKind,
    width: usize,
) -> Step {
    let at = rr.position();
    e.emit(kind)?;
    e.mark(at);
    rr.consume(width);
    e.emit(TokenKind::ListClose)?;
    Ok(Some(State::Initial))
}

fn missing_separator(e: &Emitter, at: Position) -> Error {
    Error::new(
        ErrorImpl::MissingSeparator {
            token: e.pending().to_string(),
        },
        at,
    )
}

fn initial_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = rr.peek_rune()?;
    if r.is_whitespace() {
        rr.consume(sz);
        return Ok(Some(State::Initial));
    }

    e.mark(rr.position());

    match r {
        ')' => {
            rr.consume(sz);
            e.emit(TokenKind::ListClose)?;
            Ok(Some(State::Initial))
        }
        '(' => {
            rr.consume(sz);
            e.emit(TokenKind::ListOpen)?;
            Ok(Some(State::Initial))
        }
        '-' => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::MaybeNumber))
        }
        '"' => {
            rr.consume(sz);
            Ok(Some(State::QuotedString))
        }
        '`' => {
            rr.consume(sz);
            Ok(Some(State::MultilineString))
        }
        _ if r.is_ascii_digit() => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::Number))
        }
        // any other leading rune starts a symbol
        _ => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::Symbol))
        }
    }
}

fn symbol_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_or_flush(e, rr, TokenKind::Symbol)?;
    let at = rr.position();

    match r {
        _ if r.is_whitespace() => {
            rr.consume(sz);
            e.emit(TokenKind::Symbol)?;
            Ok(Some(State::Initial))
        }
        '(' => Err(missing_separator(e, at)),
        ')' => close_after(e, rr, TokenKind::Symbol, sz),
        _ if is_symbol_rune(r) => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::Symbol))
        }
        _ => Err(unexpected(r, State::Symbol, at)),
    }
}

fn number_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_or_flush(e, rr, TokenKind::IntNumber)?;
    let at = rr.position();

    match r {
        _ if r.is_whitespace() => {
            rr.consume(sz);
            e.emit(TokenKind::IntNumber)?;
            Ok(Some(State::Initial))
        }
        // digit group separator
        '_' => {
            rr.consume(sz);
            Ok(Some(State::Number))
        }
        '.' => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::Decimal))
        }
        _ if r.is_ascii_digit() => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::Number))
        }
        '(' => Err(missing_separator(e, at)),
        ')' => close_after(e, rr, TokenKind::IntNumber, sz),
        _ => Err(unexpected(r, State::Number, at)),
    }
}

fn decimal_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_or_flush(e, rr, TokenKind::DecimalNumber)?;
    let at = rr.position();

    match r {
        _ if r.is_whitespace() => {
            rr.consume(sz);
            e.emit(TokenKind::DecimalNumber)?;
            Ok(Some(State::Initial))
        }
        '_' => {
            rr.consume(sz);
            Ok(Some(State::Decimal))
        }
        _ if r.is_ascii_digit() => {
            rr.consume(sz);
            e.push(r);
            Ok(Some(State::Decimal))
        }
        '(' => Err(missing_separator(e, at)),
        ')' => close_after(e, rr, TokenKind::DecimalNumber, sz),
        _ => Err(unexpected(r, State::Decimal, at)),
    }
}

/// Decides whether a leading `-` starts a negative number or a symbol.
fn maybe_number_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_or_flush(e, rr, TokenKind::Symbol)?;

    if r.is_ascii_digit() {
        rr.consume(sz);
        e.push(r);
        return Ok(Some(State::Number));
    }

    Ok(Some(State::Symbol))
}

fn quoted_string_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_in_string(e, rr)?;
    let at = rr.position();
    rr.consume(sz);

    match r {
        '\\' => Ok(Some(State::EscapeString)),
        '"' => {
            e.emit(TokenKind::String)?;
            Ok(Some(State::Initial))
        }
        '\r' | '\n' => Err(Error::new(ErrorImpl::NewlineInString, at)),
        _ => {
            e.push(r);
            Ok(Some(State::QuotedString))
        }
    }
}

fn escape_string_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_in_string(e, rr)?;
    let at = rr.position();
    rr.consume(sz);

    match r {
        '"' | '\\' => {
            e.push(r);
            Ok(Some(State::QuotedString))
        }
        _ => Err(Error::new(ErrorImpl::InvalidEscape { rune: r }, at)),
    }
}

fn multiline_string_state<R: Read>(e: &mut Emitter, rr: &mut RuneReader<R>) -> Step {
    let (r, sz) = peek_in_string(e, rr)?;
    rr.consume(sz);

    if r == '`' {
        e.emit(TokenKind::String)?;
        return Ok(Some(State::Initial));
    }

    e.push(r);
    Ok(Some(State::MultilineString))
}
