use lazy_static::lazy_static;
use miette::Result;
use regex::Regex;

use crate::error;
use crate::lexer::cursor::Cursor;
use crate::symbol::{Span, SrcOffset};

pub mod cursor;

lazy_static! {
    static ref REGISTER: Regex = Regex::new(r"^[rR]([0-9]+)$").unwrap();
}

/// A 'light' token that only carries basic and easily derivable info
#[derive(Debug)]
pub struct LToken {
    pub kind: LTokenKind,
    pub len: usize,
}

impl LToken {
    pub fn new(kind: LTokenKind, len: usize) -> Self {
        LToken { kind, len }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LTokenKind {
    Ident,
    /// Starts with a digit, validated later
    Lit,
    /// `-` followed by digits
    NegLit,
    Colon,
    Comma,
    Newline,
    Comment,
    Whitespace,
    Unknown,
    Eof,
}

/// Token with its value resolved and its position in the full source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based source line
    pub line: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic or label name
    Ident,
    /// Register index, not yet range-checked
    Reg(u32),
    Lit(u32),
    Colon,
    Comma,
    Newline,
}

/// Test if a character is considered to be whitespace.
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

/// Test if a character can appear inside an identifier or literal.
pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> LToken {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return LToken::new(LTokenKind::Eof, 0),
        };
        let token_kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                LTokenKind::Comment
            }
            '\n' => LTokenKind::Newline,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                LTokenKind::Whitespace
            }
            ',' => LTokenKind::Comma,
            ':' => LTokenKind::Colon,
            '0'..='9' => {
                self.take_while(is_id);
                LTokenKind::Lit
            }
            '-' if self.first().is_ascii_digit() => {
                self.take_while(is_id);
                LTokenKind::NegLit
            }
            // Identifiers should be checked after everything else that overlaps.
            c if is_id(c) => {
                self.take_while(is_id);
                LTokenKind::Ident
            }
            _ => LTokenKind::Unknown,
        };
        LToken::new(token_kind, self.pos_in_token())
    }
}

/// Parse an unsigned literal: decimal, or `0x`/`0b`/`0o` prefixed.
pub fn parse_lit(text: &str) -> Option<u32> {
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else {
        (lower.as_str(), 10)
    };
    // `from_str_radix` accepts a leading `+`
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    // Leading zeros look like C octal, only a run of zeros is allowed
    if radix == 10 && digits.starts_with('0') && !digits.trim_start_matches('0').is_empty() {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

/// Split source into tokens, dropping whitespace and comments.
///
/// Newlines are kept so the assembler can work line by line.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut cursor = Cursor::new(src);
    let mut toks = Vec::new();
    let mut line = 1;

    loop {
        cursor.reset_pos();
        let start = cursor.token_start();
        let ltok = cursor.advance_token();
        let text = cursor.token_str();
        let span = Span::new(SrcOffset(start), ltok.len);

        let kind = match ltok.kind {
            LTokenKind::Eof => break,
            LTokenKind::Whitespace | LTokenKind::Comment => continue,
            LTokenKind::Unknown => return Err(error::lex_unknown(span, src, line)),
            LTokenKind::NegLit => return Err(error::lex_negative_lit(span, src, line)),
            LTokenKind::Lit => match parse_lit(text) {
                Some(val) => TokenKind::Lit(val),
                None => return Err(error::lex_invalid_lit(span, src, line)),
            },
            LTokenKind::Ident => match REGISTER.captures(text) {
                Some(caps) => match caps[1].parse::<u32>() {
                    Ok(idx) => TokenKind::Reg(idx),
                    // Absurdly large register index, still out of range
                    Err(_) => TokenKind::Reg(u32::MAX),
                },
                None => TokenKind::Ident,
            },
            LTokenKind::Colon => TokenKind::Colon,
            LTokenKind::Comma => TokenKind::Comma,
            LTokenKind::Newline => TokenKind::Newline,
        };
        toks.push(Token { kind, span, line });
        if kind == TokenKind::Newline {
            line += 1;
        }
    }
    Ok(toks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|tok| tok.kind).collect()
    }

    #[test]
    fn instruction_line() {
        assert_eq!(
            kinds("loop: ADD r1, R2,R3 ; sum"),
            vec![
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Reg(1),
                TokenKind::Comma,
                TokenKind::Reg(2),
                TokenKind::Comma,
                TokenKind::Reg(3),
            ]
        );
    }

    #[test]
    fn literal_radixes() {
        assert_eq!(
            kinds("10 0x1F 0b101 0o17 0XfF"),
            vec![
                TokenKind::Lit(10),
                TokenKind::Lit(31),
                TokenKind::Lit(5),
                TokenKind::Lit(15),
                TokenKind::Lit(255),
            ]
        );
    }

    #[test]
    fn bad_literals() {
        assert!(tokenize("LDI R0, 12ab").is_err());
        assert!(tokenize("LDI R0, 0x").is_err());
        assert!(tokenize("LDI R0, 0b102").is_err());
        assert!(tokenize("LDI R0, 99999999999").is_err());
        assert!(tokenize("LDI R0, 010").is_err());
    }

    #[test]
    fn zero_literals() {
        assert_eq!(parse_lit("0"), Some(0));
        assert_eq!(parse_lit("000"), Some(0));
        assert_eq!(parse_lit("0x00F"), Some(15));
        assert_eq!(parse_lit("010"), None);
        assert_eq!(parse_lit("10"), Some(10));
    }

    #[test]
    fn negative_literal_rejected() {
        let err = tokenize("NOP\nLDI R0, -1").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unknown_token() {
        let err = tokenize("LDI R0, #5").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn register_names() {
        assert_eq!(kinds("r0 R15 R16"), vec![
            TokenKind::Reg(0),
            TokenKind::Reg(15),
            TokenKind::Reg(16),
        ]);
        // Not registers
        assert_eq!(kinds("rx r_1"), vec![TokenKind::Ident, TokenKind::Ident]);
    }

    #[test]
    fn lines_and_spans() {
        let src = "NOP\n\n  HLT";
        let toks = tokenize(src).unwrap();
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[3].line, 3);
        assert_eq!(&src[toks[3].span.range()], "HLT");
        assert_eq!(&src[toks[0].span.range()], "NOP");
    }

    // Regression
    #[test]
    fn comment_at_end_of_file() {
        assert_eq!(kinds("HLT ;"), vec![TokenKind::Ident]);
        assert!(kinds(";only a comment").is_empty());
    }
}
