use std::fmt;

use crate::interner::Symbol;

/// The kind of a surface-language token. `Eof` compares equal to any other
/// `Eof` token regardless of value, matching the source lexer's sentinel
/// convention of a single end-of-stream marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TokenKind {
    Eof,
    Identifier,
    Number,
    Command,
    Operator,
    Type,
    Punctuation,
    Comment,
}

/// A lexeme produced by the surface-language lexer.
///
/// Equality is structural on `(kind, text)`, except that two `Eof` tokens are
/// always equal regardless of `text` — this lets the grammar express
/// "end of input" as a plain literal pattern.
#[derive(Debug, Clone, Hash, serde::Serialize, serde::Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    pub fn eof() -> Self {
        Token {
            kind: TokenKind::Eof,
            text: String::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        if self.kind == TokenKind::Eof || other.kind == TokenKind::Eof {
            return self.kind == other.kind;
        }
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.kind, self.text)
    }
}

/// A byte-offset span into the original source, used only for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }
}

/// A symbolic reference to a terminal's token kind, used in grammar
/// construction and in substitution tables. Kept separate from `Token` so a
/// grammar can describe "any identifier" without committing to its text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TokenPattern {
    /// Match a token with this exact (kind, text).
    Exact(Token),
    /// Match any token of this kind, regardless of text.
    Kind(TokenKind),
}

impl TokenPattern {
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            TokenPattern::Exact(pattern) => pattern == token,
            TokenPattern::Kind(kind) => token.kind == *kind,
        }
    }
}

/// Interned name, used for rule names and variable names where repeated
/// hashing/comparison of owned `String`s would be wasteful.
pub type Name = Symbol;
