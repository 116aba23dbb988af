//! Lexical token definitions.

use crate::types::LiteralValue;

/// Kind of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier, keyword or operator name (`Name`, `eq`, `any`, `$it`).
    Identifier,
    /// Literal with its decoded value.
    Literal(LiteralValue),
    OpenParen,
    CloseParen,
    Comma,
    Slash,
    Colon,
    Semicolon,
    Equal,
    Dot,
    Star,
    Minus,
    /// End of text.
    End,
}

/// Token with its source text and byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, text: String, position: usize) -> Self {
        Token {
            kind,
            text,
            position,
        }
    }

    /// Byte offset just past this token.
    #[must_use]
    pub fn end(&self) -> usize {
        self.position + self.text.len()
    }

    /// Returns true if this is the identifier `word`.
    #[must_use]
    pub fn is_identifier(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == word
    }

    /// Human-readable description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::End => "end of text".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}
