// Heavily inspired by `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

pub(crate) const EOF_CHAR: char = '\0';

/// Peekable iterator over a char sequence.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// Remaining length at the start of the current token
    len_remaining: usize,
    /// Full input, used to compute absolute offsets
    src: &'a str,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            src: input,
            chars: input.chars(),
        }
    }

    /// Peek the next char without consuming it. Returns `EOF_CHAR` at end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Advance by one character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consume chars while `predicate` holds.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Bytes consumed since the last call to `reset_pos`.
    pub fn pos_in_token(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    /// Mark the start of a new token.
    pub fn reset_pos(&mut self) {
        self.len_remaining = self.chars.as_str().len();
    }

    /// Offset of the start of the current token from the start of the input.
    pub fn token_start(&self) -> usize {
        self.src.len() - self.len_remaining
    }

    /// Text of the current (unfinished) token.
    pub fn token_str(&self) -> &'a str {
        let start = self.token_start();
        &self.src[start..start + self.pos_in_token()]
    }
}
