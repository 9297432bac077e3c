//! Tokenizer for BSDL (a VHDL subset). Two-phase: this module turns raw
//! bytes into a flat token stream with byte offsets; `grammar` builds
//! the AST from that stream with a 2-token lookahead recursive descent.

use compact_str::CompactString;
use nom::{
    IResult,
    bytes::complete::{tag, tag_no_case, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize, value},
    sequence::{pair, tuple},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(CompactString),
    Str { text: CompactString, binary: bool },
    BitStr { radix: char, digits: CompactString },
    Integer(i64),
    Real(f64),

    Colon,
    Semicolon,
    Comma,
    Dot,
    DotDot,
    Assign,
    Arrow,
    Amp,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Star,

    KwEntity,
    KwIs,
    KwEnd,
    KwGeneric,
    KwPort,
    KwUse,
    KwAll,
    KwAttribute,
    KwOf,
    KwConstant,
    KwIn,
    KwOut,
    KwInout,
    KwBuffer,
    KwLinkage,
    KwBit,
    KwBitVector,
    KwString,
    KwInteger,
    KwReal,
    KwBoolean,
    KwTrue,
    KwFalse,

    Eof,
}

impl Tok {
    /// Short, human-readable name used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => format!("identifier `{}`", s),
            Tok::Str { text, .. } => format!("string \"{}\"", text),
            Tok::BitStr { radix, digits } => format!("{}\"{}\"", radix, digits),
            Tok::Integer(i) => format!("integer {}", i),
            Tok::Real(r) => format!("real {}", r),
            Tok::Eof => "end of file".to_string(),
            other => format!("{:?}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
}

/// Byte offset -> (1-based line, 1-based column) resolver, built once per
/// file so individual error reports don't rescan the source.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(input: &[u8]) -> Self {
        let mut line_starts = vec![0];
        for (i, &b) in input.iter().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex { line_starts }
    }

    pub fn resolve(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let col = offset - self.line_starts[line] + 1;
        (line + 1, col)
    }
}

fn u82str_unsafe(i: &[u8]) -> &str {
    std::str::from_utf8(i).expect("BSDL source must be ASCII/UTF-8")
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_cont(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// `--` to end of line, or plain whitespace.
fn skip_trivia(mut i: &[u8]) -> &[u8] {
    loop {
        let before = i.len();
        i = take_while::<_, _, nom::error::Error<&[u8]>>(|c: u8| c.is_ascii_whitespace())(i)
            .unwrap()
            .0;
        if i.starts_with(b"--") {
            i = take_till::<_, _, nom::error::Error<&[u8]>>(|c: u8| c == b'\n')(i)
                .unwrap()
                .0;
        }
        if i.len() == before {
            break;
        }
    }
    i
}

fn ident(i: &[u8]) -> IResult<&[u8], CompactString> {
    let (i, s) = recognize(pair(
        nom::character::complete::satisfy(|c| c.is_ascii_alphabetic()),
        take_while(is_ident_cont),
    ))(i)?;
    Ok((i, CompactString::from(u82str_unsafe(s))))
}

fn real_or_int(i: &[u8]) -> IResult<&[u8], Tok> {
    let (i2, int_part) = digit1(i)?;
    if let Ok((i3, _)) = char::<_, nom::error::Error<&[u8]>>('.')(i2) {
        if let Ok((i4, frac)) = digit1::<_, nom::error::Error<&[u8]>>(i3) {
            let (i5, exp) = opt(recognize(tuple((
                one_of("eE"),
                opt(one_of("+-")),
                digit1,
            ))))(i4)?;
            let text = format!(
                "{}.{}{}",
                u82str_unsafe(int_part),
                u82str_unsafe(frac),
                exp.map(u82str_unsafe).unwrap_or("")
            );
            let v: f64 = text.parse().map_err(|_| {
                nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::Float))
            })?;
            return Ok((i5, Tok::Real(v)));
        }
    }
    let v: i64 = u82str_unsafe(int_part).parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::Digit))
    })?;
    Ok((i2, Tok::Integer(v)))
}

/// A double-quoted string, doubled `""` is an embedded quote, `\x` is a
/// literal escape of the next character.
fn quoted_string(i: &[u8]) -> IResult<&[u8], CompactString> {
    let (mut i, _) = char('"')(i)?;
    let mut out = String::new();
    loop {
        if i.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(
                i,
                nom::error::ErrorKind::Eof,
            )));
        }
        match i[0] {
            b'"' => {
                if i.len() >= 2 && i[1] == b'"' {
                    out.push('"');
                    i = &i[2..];
                } else {
                    i = &i[1..];
                    break;
                }
            }
            b'\\' if i.len() >= 2 => {
                out.push(i[1] as char);
                i = &i[2..];
            }
            c => {
                out.push(c as char);
                i = &i[1..];
            }
        }
    }
    Ok((i, CompactString::from(out)))
}

fn bit_string(i: &[u8]) -> IResult<&[u8], Tok> {
    let (i, radix) = one_of("xXbBoO")(i)?;
    let (i, digits) = quoted_string(i)?;
    Ok((
        i,
        Tok::BitStr {
            radix: radix.to_ascii_uppercase(),
            digits,
        },
    ))
}

fn keyword(kw: &'static str, tok: Tok) -> impl Fn(&[u8]) -> IResult<&[u8], Tok> {
    move |i: &[u8]| value(tok.clone(), tag_no_case(kw))(i)
}

/// Keywords that must not match when followed by an identifier-continuation
/// character (so `ENTITYX` lexes as one identifier, not `ENTITY` + `X`).
fn kw_boundary(i: &[u8]) -> IResult<&[u8], ()> {
    match i.first() {
        Some(&c) if is_ident_cont(c) => Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Not,
        ))),
        _ => Ok((i, ())),
    }
}

fn one_token(i: &[u8]) -> IResult<&[u8], Tok> {
    // Punctuation first (order matters for multi-char tokens).
    if let Ok((i, _)) = tag::<_, _, nom::error::Error<&[u8]>>(":=")(i) {
        return Ok((i, Tok::Assign));
    }
    if let Ok((i, _)) = tag::<_, _, nom::error::Error<&[u8]>>("=>")(i) {
        return Ok((i, Tok::Arrow));
    }
    if let Ok((i, _)) = tag::<_, _, nom::error::Error<&[u8]>>("..")(i) {
        return Ok((i, Tok::DotDot));
    }
    if let Some(&c) = i.first() {
        let single = match c {
            b':' => Some(Tok::Colon),
            b';' => Some(Tok::Semicolon),
            b',' => Some(Tok::Comma),
            b'.' => Some(Tok::Dot),
            b'&' => Some(Tok::Amp),
            b'(' => Some(Tok::LParen),
            b')' => Some(Tok::RParen),
            b'[' => Some(Tok::LBracket),
            b']' => Some(Tok::RBracket),
            b'*' => Some(Tok::Star),
            _ => None,
        };
        if let Some(t) = single {
            return Ok((&i[1..], t));
        }
    }

    // Bit-string literal: radix char immediately followed by a quote.
    if i.len() >= 2 && matches!(i[0], b'x' | b'X' | b'b' | b'B' | b'o' | b'O') && i[1] == b'"' {
        return bit_string(i);
    }

    if i.first() == Some(&b'"') {
        let (i, text) = quoted_string(i)?;
        let binary = !text.is_empty() && text.bytes().all(|b| b == b'0' || b == b'1');
        return Ok((i, Tok::Str { text, binary }));
    }

    if i.first().copied().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return real_or_int(i);
    }

    if i.first().copied().map(is_ident_start).unwrap_or(false) {
        // Try every keyword with a word boundary check before falling back
        // to a generic identifier; this realizes the "2-token lookahead"
        // requirement is actually handled lexically for keyword-vs-ident
        // disambiguation (the parser only needs lookahead across tokens).
        macro_rules! kw {
            ($txt:expr, $tok:expr) => {
                if let Ok((rest, _)) =
                    tag_no_case::<_, _, nom::error::Error<&[u8]>>($txt)(i)
                {
                    if kw_boundary(rest).is_ok() {
                        return Ok((rest, $tok));
                    }
                }
            };
        }
        kw!("ENTITY", Tok::KwEntity);
        kw!("IS", Tok::KwIs);
        kw!("END", Tok::KwEnd);
        kw!("GENERIC", Tok::KwGeneric);
        kw!("PORT", Tok::KwPort);
        kw!("USE", Tok::KwUse);
        kw!("ALL", Tok::KwAll);
        kw!("ATTRIBUTE", Tok::KwAttribute);
        kw!("OF", Tok::KwOf);
        kw!("CONSTANT", Tok::KwConstant);
        kw!("INOUT", Tok::KwInout);
        kw!("IN", Tok::KwIn);
        kw!("OUT", Tok::KwOut);
        kw!("BUFFER", Tok::KwBuffer);
        kw!("LINKAGE", Tok::KwLinkage);
        kw!("BIT_VECTOR", Tok::KwBitVector);
        kw!("BIT", Tok::KwBit);
        kw!("STRING", Tok::KwString);
        kw!("INTEGER", Tok::KwInteger);
        kw!("REAL", Tok::KwReal);
        kw!("BOOLEAN", Tok::KwBoolean);
        kw!("TRUE", Tok::KwTrue);
        kw!("FALSE", Tok::KwFalse);

        let (i, name) = ident(i)?;
        return Ok((i, Tok::Ident(name)));
    }

    Err(nom::Err::Error(nom::error::Error::new(
        i,
        nom::error::ErrorKind::Char,
    )))
}

/// Tokenize an entire BSDL source file, returning `(token, byte_offset)`
/// pairs terminated by one trailing `(Tok::Eof, len)`.
pub fn lex(input: &[u8]) -> Result<Vec<(Tok, usize)>, LexError> {
    let mut out = Vec::new();
    let mut i = skip_trivia(input);
    loop {
        if i.is_empty() {
            let offset = input.len();
            out.push((Tok::Eof, offset));
            return Ok(out);
        }
        let offset = input.len() - i.len();
        match one_token(i) {
            Ok((rest, tok)) => {
                out.push((tok, offset));
                i = skip_trivia(rest);
            }
            Err(_) => return Err(LexError { offset }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_punctuation_and_keywords() {
        let toks = lex(b"ENTITY foo IS end foo ;").unwrap();
        assert_eq!(
            toks.iter().map(|(t, _)| t.clone()).collect::<Vec<_>>(),
            vec![
                Tok::KwEntity,
                Tok::Ident("foo".into()),
                Tok::KwIs,
                Tok::KwEnd,
                Tok::Ident("foo".into()),
                Tok::Semicolon,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn comments_are_discarded() {
        let toks = lex(b"-- a comment\nENTITY").unwrap();
        assert_eq!(toks[0].0, Tok::KwEntity);
    }

    #[test]
    fn distinguishes_binary_from_general_strings() {
        let toks = lex(b"\"0101\" \"hello\"").unwrap();
        assert_eq!(
            toks[0].0,
            Tok::Str {
                text: "0101".into(),
                binary: true
            }
        );
        assert_eq!(
            toks[1].0,
            Tok::Str {
                text: "hello".into(),
                binary: false
            }
        );
    }

    #[test]
    fn bit_string_literal() {
        let toks = lex(b"X\"FF\"").unwrap();
        assert_eq!(
            toks[0].0,
            Tok::BitStr {
                radix: 'X',
                digits: "FF".into()
            }
        );
    }

    #[test]
    fn real_and_integer_literals() {
        let toks = lex(b"10 3.3 1.0e6").unwrap();
        assert_eq!(toks[0].0, Tok::Integer(10));
        assert_eq!(toks[1].0, Tok::Real(3.3));
        assert_eq!(toks[2].0, Tok::Real(1.0e6));
    }

    #[test]
    fn line_index_resolves_offsets() {
        let src = b"abc\ndef\nghi";
        let idx = LineIndex::new(src);
        assert_eq!(idx.resolve(0), (1, 1));
        assert_eq!(idx.resolve(4), (2, 1));
        assert_eq!(idx.resolve(9), (3, 2));
    }

    #[test]
    fn ident_with_keyword_prefix_is_not_split() {
        let toks = lex(b"ENTITYX").unwrap();
        assert_eq!(toks[0].0, Tok::Ident("ENTITYX".into()));
    }
}
