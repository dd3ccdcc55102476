use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

/// A 'light' token that only carries its kind and location. Text is recovered through the span.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic or name
    Ident,
    /// Unsigned decimal literal
    Int,
    /// Variable, written `#name`
    Var,
    /// Terminates a jump point declaration
    Colon,
    /// `//` until end of line
    Comment,
    Whitespace,
    Newline,
    Unknown,
    Eof,
}

impl TokenKind {
    /// Tokens that carry no meaning for the parser.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Whitespace)
    }
}

/// Yields every token in `input`, excluding the final `Eof`.
pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    let mut offs = 0u32;
    std::iter::from_fn(move || {
        let (kind, len) = cursor.advance_token();
        if kind == TokenKind::Eof {
            return None;
        }
        let token = Token {
            kind,
            span: Span::new(Idx(offs), len),
        };
        offs += len;
        Some(token)
    })
}

/// Horizontal whitespace. Newlines are tokens of their own as they end statements.
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

/// Test if a character may appear in a mnemonic or name.
pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

impl Cursor<'_> {
    /// Lex a single token, returning its kind and length in bytes.
    pub fn advance_token(&mut self) -> (TokenKind, u32) {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return (TokenKind::Eof, 0),
        };
        let kind = match first_char {
            '/' => match self.first() {
                '/' => {
                    self.take_while(|c| c != '\n');
                    TokenKind::Comment
                }
                _ => TokenKind::Unknown,
            },
            '\n' => TokenKind::Newline,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            ':' => TokenKind::Colon,
            '#' => {
                self.take_while(is_id);
                TokenKind::Var
            }
            c if c.is_ascii_digit() => {
                self.take_while(is_id);
                TokenKind::Int
            }
            // Identifiers should be checked after everything else that overlaps.
            c if is_id(c) => {
                self.take_while(is_id);
                TokenKind::Ident
            }
            _ => TokenKind::Unknown,
        };
        let len = self.pos_in_token();
        self.reset_pos();
        (kind, len)
    }
}
