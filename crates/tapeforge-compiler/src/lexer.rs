//! Hand-rolled scanner for the surface language.
//!
//! Grounded on `examples/original_source/VarfuckTranspiler.py`'s `Lexer` and
//! `examples/original_source/EBNF.py`'s `Lexer`/`BaseLexer`: a lexer that
//! exposes `get_position`/`set_position` so the backtracking parser can
//! freely rewind it between matcher attempts. Implemented by hand rather
//! than via `logos` (used elsewhere for the macro language's fixed token
//! set) because position save/restore here must be a plain integer, not a
//! derive-generated iterator state, to keep the parser's `start()`/
//! `next_match()` bookkeeping simple.

use tapeforge_core::{Token, TokenKind};

const MULTI_CHAR_OPERATORS: &[&str] = &["**", "<<", ">>", "==", "<=", ">=", "->", "<-", "and", "or", "not"];
const SINGLE_CHAR_OPERATORS: &str = "-+|&~=*/><^";
const PUNCTUATION: &str = "()[]{},;";
const COMMANDS: &[&str] = &["fuck"];
const TYPES: &[&str] = &["num"];

pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' => {
                    self.pos += c.len_utf8();
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += c.len_utf8();
                    }
                }
                _ => return,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let Some(c) = self.peek_char() else {
            return Token::eof();
        };

        if c.is_ascii_digit() {
            return self.scan_number();
        }
        if is_ident_start(c) {
            return self.scan_word();
        }
        for op in MULTI_CHAR_OPERATORS {
            if op.chars().next().unwrap().is_alphabetic() {
                continue;
            }
            if self.rest().starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.advance();
                }
                return Token::new(TokenKind::Operator, *op);
            }
        }
        if PUNCTUATION.contains(c) {
            self.advance();
            return Token::new(TokenKind::Punctuation, c.to_string());
        }
        if SINGLE_CHAR_OPERATORS.contains(c) {
            self.advance();
            return Token::new(TokenKind::Operator, c.to_string());
        }
        self.advance();
        Token::new(TokenKind::Comment, format!("<unrecognized:{c}>"))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek_char() == Some('.') {
            let save = self.pos;
            self.advance();
            if matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = save;
            }
        }
        Token::new(TokenKind::Number, &self.source[start..self.pos])
    }

    fn scan_word(&mut self) -> Token {
        let start = self.pos;
        self.advance();
        while matches!(self.peek_char(), Some(c) if is_ident_continue(c)) {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        if COMMANDS.contains(&text) {
            Token::new(TokenKind::Command, text)
        } else if TYPES.contains(&text) {
            Token::new(TokenKind::Type, text)
        } else if MULTI_CHAR_OPERATORS.contains(&text) {
            Token::new(TokenKind::Operator, text)
        } else {
            Token::new(TokenKind::Identifier, text)
        }
    }

    /// Reports the raw unrecognized-character error as `Error::Lex`, for
    /// callers that want to fail hard on garbage input rather than let the
    /// parser simply fail to match anything.
    pub fn scan_strict(&mut self) -> Result<Token, crate::error::Error> {
        let before = self.pos;
        let token = self.next_token();
        if token.kind == TokenKind::Comment && token.text.starts_with("<unrecognized:") {
            return Err(crate::error::Error::Lex {
                ch: self.source[before..].chars().next().unwrap_or('\0'),
                offset: before,
            });
        }
        Ok(token)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_identifiers_and_numbers() {
        let mut lexer = Lexer::new("foo 42 bar");
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "foo"));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Number, "42"));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "bar"));
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn position_can_be_rewound() {
        let mut lexer = Lexer::new("a b c");
        let save = lexer.position();
        let _ = lexer.next_token();
        lexer.set_position(save);
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "a"));
    }

    #[test]
    fn recognizes_commands_and_types() {
        let mut lexer = Lexer::new("fuck num x");
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Command, "fuck"));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Type, "num"));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "x"));
    }

    #[test]
    fn multi_char_operators_take_priority() {
        let mut lexer = Lexer::new("a << b");
        let _ = lexer.next_token();
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Operator, "<<"));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let mut lexer = Lexer::new("a # comment here\nb");
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "a"));
        assert_eq!(lexer.next_token(), Token::new(TokenKind::Identifier, "b"));
    }
}
