//! Unit tests for the lexer module.
//!
//! This module contains tests for tokenization including:
//! - Lists, symbols and negative number disambiguation
//! - Integer and decimal literals with digit separators
//! - Quoted strings with escape sequences and multiline strings
//! - Rune decoding and position tracking
//! - Cancellation of a running lexer
//! - Error cases

use std::{
    thread,
    time::{Duration, Instant},
};

use pretty_assertions::assert_eq;

use super::{
    context::Context,
    lexer::{spawn_lexer, tokenize},
    rune_reader::RuneReader,
    tokens::{Token, TokenKind},
};
use crate::{
    errors::errors::{CancelCause, ErrorImpl, ErrorKind},
    value::value::Value,
    Position, MK_TOKEN,
};

fn kinds_and_values(tokens: &[Token]) -> Vec<(&'static str, &str)> {
    tokens
        .iter()
        .map(|t| (t.kind.name(), t.value.as_str()))
        .collect()
}

#[test]
fn test_tokenize_literals() {
    let tokens = tokenize(r#"(a 123 123.3 -123 -123.3 "str" "ab\"\\")"#).unwrap();

    assert_eq!(
        tokens,
        vec![
            MK_TOKEN!(TokenKind::ListOpen),
            MK_TOKEN!(TokenKind::Symbol, "a"),
            MK_TOKEN!(TokenKind::IntNumber, "123"),
            MK_TOKEN!(TokenKind::DecimalNumber, "123.3"),
            MK_TOKEN!(TokenKind::IntNumber, "-123"),
            MK_TOKEN!(TokenKind::DecimalNumber, "-123.3"),
            MK_TOKEN!(TokenKind::String, "str"),
            MK_TOKEN!(TokenKind::String, "ab\"\\"),
            MK_TOKEN!(TokenKind::ListClose),
        ]
    );
}

#[test]
fn test_tokenize_negative_numbers() {
    assert_eq!(
        kinds_and_values(&tokenize("-123").unwrap()),
        vec![("int_number", "-123")]
    );
    assert_eq!(
        kinds_and_values(&tokenize("-123.3").unwrap()),
        vec![("decimal_number", "-123.3")]
    );
    assert_eq!(
        kinds_and_values(&tokenize("-foo").unwrap()),
        vec![("symbol", "-foo")]
    );
}

#[test]
fn test_tokenize_lone_dash_is_symbol() {
    assert_eq!(kinds_and_values(&tokenize("-").unwrap()), vec![("symbol", "-")]);
    assert_eq!(
        kinds_and_values(&tokenize("(- 1 -2)").unwrap()),
        vec![
            ("lopen", ""),
            ("symbol", "-"),
            ("int_number", "1"),
            ("int_number", "-2"),
            ("lclose", ""),
        ]
    );
    assert_eq!(
        kinds_and_values(&tokenize("(-)").unwrap()),
        vec![("lopen", ""), ("symbol", "-"), ("lclose", "")]
    );
}

#[test]
fn test_tokenize_nested_lists() {
    let tokens = tokenize("(define (sq x) (* x x))").unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("lopen", ""),
            ("symbol", "define"),
            ("lopen", ""),
            ("symbol", "sq"),
            ("symbol", "x"),
            ("lclose", ""),
            ("lopen", ""),
            ("symbol", "*"),
            ("symbol", "x"),
            ("symbol", "x"),
            ("lclose", ""),
            ("lclose", ""),
        ]
    );
}

#[test]
fn test_tokenize_atoms_before_close() {
    let tokens = tokenize("(1 2.5)").unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("lopen", ""),
            ("int_number", "1"),
            ("decimal_number", "2.5"),
            ("lclose", ""),
        ]
    );
}

#[test]
fn test_tokenize_digit_separators() {
    let tokens = tokenize("1_000_000 3.141_592").unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![("int_number", "1000000"), ("decimal_number", "3.141592")]
    );
}

#[test]
fn test_tokenize_symbols() {
    let tokens = tokenize("foo bar-baz _under CamelCase <= set! λ→x a.b/c").unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("symbol", "foo"),
            ("symbol", "bar-baz"),
            ("symbol", "_under"),
            ("symbol", "CamelCase"),
            ("symbol", "<="),
            ("symbol", "set!"),
            ("symbol", "λ→x"),
            ("symbol", "a.b/c"),
        ]
    );
}

#[test]
fn test_tokenize_whitespace_handling() {
    let tokens = tokenize("  \t(a\r\n\u{3000}b )  \n").unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![("lopen", ""), ("symbol", "a"), ("symbol", "b"), ("lclose", "")]
    );
}

#[test]
fn test_tokenize_empty_input() {
    assert!(tokenize("").unwrap().is_empty());
    assert!(tokenize("   \n\t ").unwrap().is_empty());
}

#[test]
fn test_tokenize_string_escapes() {
    let tokens = tokenize(r#""quote\"test" "back\\slash" """#).unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("string", "quote\"test"),
            ("string", "back\\slash"),
            ("string", ""),
        ]
    );
}

#[test]
fn test_tokenize_invalid_escape() {
    let err = tokenize(r#"("hello\nworld")"#).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Lexical);
    assert!(matches!(err.get_impl(), ErrorImpl::InvalidEscape { rune: 'n' }));
}

#[test]
fn test_tokenize_newline_in_quoted_string() {
    let err = tokenize("\"first\nsecond\"").unwrap_err();
    assert!(matches!(err.get_impl(), ErrorImpl::NewlineInString));

    let err = tokenize("\"first\r\nsecond\"").unwrap_err();
    assert!(matches!(err.get_impl(), ErrorImpl::NewlineInString));
}

#[test]
fn test_tokenize_multiline_string() {
    let tokens = tokenize("(print `line one\n\"two\" \\n`)").unwrap();

    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("lopen", ""),
            ("symbol", "print"),
            ("string", "line one\n\"two\" \\n"),
            ("lclose", ""),
        ]
    );
}

#[test]
fn test_tokenize_unterminated_strings() {
    let err = tokenize(r#"(a "open"#).unwrap_err();
    assert!(matches!(err.get_impl(), ErrorImpl::UnterminatedString));
    assert_eq!(err.get_position().column, 4);

    let err = tokenize("`never closed").unwrap_err();
    assert!(matches!(err.get_impl(), ErrorImpl::UnterminatedString));

    let err = tokenize(r#""trailing\"#).unwrap_err();
    assert!(matches!(err.get_impl(), ErrorImpl::UnterminatedString));
}

#[test]
fn test_tokenize_symbol_needs_separator() {
    let err = tokenize("(foo(bar))").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Lexical);
    match err.get_impl() {
        ErrorImpl::MissingSeparator { token } => assert_eq!(token, "foo"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.get_position().column, 5);
}

#[test]
fn test_tokenize_number_needs_separator() {
    let err = tokenize("(12(a))").unwrap_err();
    assert!(matches!(err.get_impl(), ErrorImpl::MissingSeparator { .. }));
}

#[test]
fn test_tokenize_unexpected_runes() {
    let err = tokenize("12a").unwrap_err();
    assert!(matches!(
        err.get_impl(),
        ErrorImpl::UnexpectedRune {
            rune: 'a',
            state: "number"
        }
    ));

    let err = tokenize("1.2.3").unwrap_err();
    assert!(matches!(
        err.get_impl(),
        ErrorImpl::UnexpectedRune { rune: '.', .. }
    ));

    let err = tokenize("ab\u{7}").unwrap_err();
    assert!(matches!(
        err.get_impl(),
        ErrorImpl::UnexpectedRune { rune: '\u{7}', .. }
    ));

}

#[test]
fn test_tokenize_leading_rune_starts_symbol() {
    let tokens = tokenize("\u{7} x").unwrap();
    assert_eq!(
        kinds_and_values(&tokens),
        vec![("symbol", "\u{7}"), ("symbol", "x")]
    );

    let tokens = tokenize("(a\"b c`d)").unwrap();
    assert_eq!(
        kinds_and_values(&tokens),
        vec![
            ("lopen", ""),
            ("symbol", "a\"b"),
            ("symbol", "c`d"),
            ("lclose", ""),
        ]
    );
}

#[test]
fn test_tokenize_positions() {
    let tokens = tokenize("(a\n  bc)").unwrap();
    let positions: Vec<(u32, u32)> = tokens
        .iter()
        .map(|t| (t.position.line, t.position.column))
        .collect();

    assert_eq!(positions, vec![(1, 1), (1, 2), (2, 3), (2, 5)]);
    assert_eq!(tokens[2].position.offset, 5);
}

#[test]
fn test_spawn_lexer_invalid_encoding() {
    let mut stream = spawn_lexer(Context::background(), &b"(ok \xff)"[..]).unwrap();

    let tokens: Vec<Token> = stream.by_ref().collect();
    assert_eq!(
        tokens,
        vec![
            MK_TOKEN!(TokenKind::ListOpen),
            MK_TOKEN!(TokenKind::Symbol, "ok")
        ]
    );

    let err = stream.finish().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
}

#[test]
fn test_spawn_lexer_streams_tokens() {
    let source = "(a (b c) \"d\")".to_string();
    let mut stream = spawn_lexer(Context::background(), std::io::Cursor::new(source)).unwrap();

    let names: Vec<&'static str> = stream.by_ref().map(|t| t.kind.name()).collect();
    assert_eq!(
        names,
        vec!["lopen", "symbol", "lopen", "symbol", "symbol", "lclose", "string", "lclose"]
    );
    assert!(stream.finish().is_ok());
}

#[test]
fn test_cancelled_before_start_emits_nothing() {
    let (ctx, canceller) = Context::with_cancel();
    canceller.cancel();

    let mut stream = spawn_lexer(ctx, &b"(a b c)"[..]).unwrap();
    let tokens: Vec<Token> = stream.by_ref().collect();
    assert!(tokens.is_empty());

    let err = stream.finish().unwrap_err();
    assert!(matches!(
        err.get_impl(),
        ErrorImpl::Cancelled {
            cause: CancelCause::Cancelled
        }
    ));
}

#[test]
fn test_cancel_stops_blocked_lexer() {
    let (ctx, canceller) = Context::with_cancel();
    let mut stream = spawn_lexer(ctx, &b"(a b c d e f)"[..]).unwrap();

    assert_eq!(stream.next(), Some(MK_TOKEN!(TokenKind::ListOpen)));
    canceller.cancel();
    assert!(stream.by_ref().count() <= 1);

    let err = stream.finish().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn test_deadline_stops_stalled_consumer() {
    let ctx = Context::with_timeout(Duration::from_millis(50));
    let stream = spawn_lexer(ctx, &b"(a b c)"[..]).unwrap();

    thread::sleep(Duration::from_millis(300));

    let err = stream.finish().unwrap_err();
    assert!(matches!(
        err.get_impl(),
        ErrorImpl::Cancelled {
            cause: CancelCause::DeadlineExceeded
        }
    ));
}

#[test]
fn test_expired_deadline_emits_nothing() {
    let ctx = Context::with_deadline(Instant::now());
    let mut stream = spawn_lexer(ctx, &b"a"[..]).unwrap();

    assert_eq!(stream.next(), None);
    assert_eq!(stream.finish().unwrap_err().kind(), ErrorKind::Cancelled);
}

#[test]
fn test_dropped_consumer_disconnects_lexer() {
    let mut stream = spawn_lexer(Context::background(), &b"(a b c)"[..]).unwrap();
    assert!(stream.next().is_some());

    let err = stream.finish().unwrap_err();
    assert!(matches!(
        err.get_impl(),
        ErrorImpl::Cancelled {
            cause: CancelCause::Disconnected
        }
    ));
}

#[test]
fn test_context_err() {
    assert_eq!(Context::background().err(), None);

    let (ctx, canceller) = Context::with_cancel();
    let copy = ctx.clone();
    assert!(!ctx.is_done());
    drop(canceller);
    assert_eq!(ctx.err(), Some(CancelCause::Cancelled));
    assert_eq!(copy.err(), Some(CancelCause::Cancelled));

    let later = Instant::now() + Duration::from_secs(60);
    let ctx = Context::with_deadline(later).deadline_at(later + Duration::from_secs(60));
    assert_eq!(ctx.deadline(), Some(later));
    assert_eq!(ctx.err(), None);
}

#[test]
fn test_token_to_value() {
    let tokens = tokenize(r#"sym 42 -7 2.5 "text""#).unwrap();
    let values: Vec<Value> = tokens.iter().map(|t| t.to_value().unwrap()).collect();

    assert_eq!(
        values,
        vec![
            Value::sym("sym"),
            Value::Integer(42),
            Value::Integer(-7),
            Value::Double(2.5),
            Value::from("text"),
        ]
    );
}

#[test]
fn test_token_to_value_errors() {
    let overflow = MK_TOKEN!(TokenKind::IntNumber, "99999999999999999999");
    let err = overflow.to_value().unwrap_err();
    assert_eq!(err.get_error_name(), "NumberParseError");

    let open = MK_TOKEN!(TokenKind::ListOpen);
    let err = open.to_value().unwrap_err();
    assert_eq!(err.get_error_name(), "UnexpectedToken");
    assert!(!TokenKind::ListOpen.is_literal());
    assert!(TokenKind::String.is_literal());
}

#[test]
fn test_token_display() {
    let token = MK_TOKEN!(TokenKind::IntNumber, "12".to_string(), Position::start());
    assert_eq!(token.to_string(), "{int_number: 12}");
    assert_eq!(MK_TOKEN!(TokenKind::ListClose).to_string(), "{lclose: }");
}

#[test]
fn test_rune_reader_multibyte() {
    let mut rr = RuneReader::new("aé€😀".as_bytes());

    assert_eq!(rr.peek_rune().unwrap(), ('a', 1));
    assert_eq!(rr.peek_rune().unwrap(), ('a', 1));
    assert_eq!(rr.read_rune().unwrap(), ('a', 1));
    assert_eq!(rr.read_rune().unwrap(), ('é', 2));
    assert_eq!(rr.read_rune().unwrap(), ('€', 3));
    assert_eq!(rr.read_rune().unwrap(), ('😀', 4));

    let err = rr.peek_rune().unwrap_err();
    assert!(err.is_end_of_input());
    assert_eq!(rr.position().offset, 10);
    assert_eq!(rr.position().column, 5);
}

#[test]
fn test_rune_reader_invalid_encoding() {
    let mut rr = RuneReader::new(&[0xffu8, b'a'][..]);
    assert_eq!(rr.peek_rune().unwrap_err().kind(), ErrorKind::InvalidEncoding);

    // a truncated three byte sequence
    let mut rr = RuneReader::new(&[b'x', 0xe2, 0x82][..]);
    assert_eq!(rr.read_rune().unwrap(), ('x', 1));
    assert_eq!(rr.peek_rune().unwrap_err().kind(), ErrorKind::InvalidEncoding);
}

#[test]
fn test_rune_reader_tracks_lines() {
    let mut rr = RuneReader::new("a\nbc".as_bytes());
    assert_eq!(rr.position(), Position::start());

    let (_, sz) = rr.peek_rune().unwrap();
    rr.consume(sz);
    rr.read_rune().unwrap();
    assert_eq!((rr.position().line, rr.position().column), (2, 1));

    rr.read_rune().unwrap();
    assert_eq!((rr.position().line, rr.position().column), (2, 2));
    assert_eq!(rr.position().offset, 3);
}
