//! The macro language: a textual superset of the eight raw target-ISA
//! characters, adding counted repetition and named, parameterized macro
//! invocations. This is the format `tapeforge-compiler`'s Processor emits
//! and `tapeforge-vm`'s expander consumes.

use logos::Logos;

use crate::instr::Instr;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
pub enum MacroToken {
    #[token("<")]
    Left,
    #[token(">")]
    Right,
    #[token("-")]
    Dec,
    #[token("+")]
    Inc,
    #[token(".")]
    Output,
    #[token(",")]
    Input,
    #[token("[")]
    JumpIfZero,
    #[token("]")]
    JumpIfNonzero,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token("@")]
    At,
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i128>().ok())]
    Number(i128),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl MacroToken {
    fn raw_op(&self) -> Option<Instr> {
        Some(match self {
            MacroToken::Left => Instr::Left,
            MacroToken::Right => Instr::Right,
            MacroToken::Dec => Instr::Dec,
            MacroToken::Inc => Instr::Inc,
            MacroToken::Output => Instr::Output,
            MacroToken::Input => Instr::Input,
            MacroToken::JumpIfZero => Instr::JumpIfZero,
            MacroToken::JumpIfNonzero => Instr::JumpIfNonzero,
            _ => return None,
        })
    }
}

/// A single element of the macro language's abstract syntax: either a raw
/// ISA instruction (optionally repeated), a named macro invocation
/// (optionally repeated), a declared memory region, an uncounted repeat
/// block, or a condition dispatch (`while`/`ifel`).
#[derive(Debug, Clone, PartialEq)]
pub enum MacroItem {
    Raw(Instr),
    RepeatRaw(u32, Instr),
    Call { name: String, args: Vec<i128> },
    RepeatCall { count: u32, name: String, args: Vec<i128> },
    /// `mem( ... )`: the special primitive demarcating a region whose net
    /// pointer excursion is excluded from the minimum-tape-size upper bound
    /// (the source's `in_mem`/`glide_based` mechanism).
    Mem(Vec<MacroItem>),
    /// `N repeat( ... )`: identical to `RepeatRaw`/`RepeatCall` in effect,
    /// but wraps an arbitrary block rather than a single op or call —
    /// `StackManager`'s clearing loops and scoped sections emit this form.
    Repeat(u32, Vec<MacroItem>),
    /// `while(prefix;body)`: `prefix` recomputes the loop condition into the
    /// cell the expander tests; it is spliced once before the loop and again
    /// at the end of every iteration, so the condition is live on each
    /// re-check (`prefix [ body prefix ]`).
    While { prefix: Vec<MacroItem>, body: Vec<MacroItem> },
    /// `ifel(then;else)`: dispatches on the current cell, which by
    /// construction has already been folded to 0/1 by a preceding
    /// `boolbinx` call.
    IfEl { then_branch: Vec<MacroItem>, else_branch: Vec<MacroItem> },
}

#[derive(Debug, thiserror::Error)]
pub enum MacroSyntaxError {
    #[error("unexpected end of macro-language input")]
    UnexpectedEof,
    #[error("unrecognized token at byte offset {0}")]
    UnrecognizedToken(usize),
    #[error("expected `{expected}`, found `{found:?}` at byte offset {offset}")]
    Expected {
        expected: &'static str,
        found: Option<MacroToken>,
        offset: usize,
    },
}

/// What ends a call to `parse_items`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Top level: runs to end-of-input.
    Eof,
    /// Inside `mem(...)`/`repeat(...)`: runs to the closing `)`.
    RParen,
    /// The first half of `while(...)`/`ifel(...)`: runs to a top-level `;`,
    /// leaving it unconsumed for the caller to `expect`.
    Semicolon,
}

/// Recursive-descent parser over the macro language's token stream.
pub struct MacroParser<'src> {
    tokens: Vec<(Result<MacroToken, ()>, logos::Span)>,
    pos: usize,
    _source: &'src str,
}

impl<'src> MacroParser<'src> {
    pub fn new(source: &'src str) -> Self {
        let tokens: Vec<_> = MacroToken::lexer(source)
            .spanned()
            .map(|(tok, span)| (tok.map_err(|_| ()), span))
            .collect();
        MacroParser {
            tokens,
            pos: 0,
            _source: source,
        }
    }

    pub fn parse_program(&mut self) -> Result<Vec<MacroItem>, MacroSyntaxError> {
        let items = self.parse_items(Stop::Eof)?;
        Ok(items)
    }

    fn peek(&self) -> Option<&MacroToken> {
        self.tokens.get(self.pos).and_then(|(t, _)| t.as_ref().ok())
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self._source.len())
    }

    fn bump(&mut self) -> Option<MacroToken> {
        let tok = self.peek().cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &'static str, matches: impl Fn(&MacroToken) -> bool) -> Result<(), MacroSyntaxError> {
        match self.peek() {
            Some(t) if matches(t) => {
                self.pos += 1;
                Ok(())
            }
            other => Err(MacroSyntaxError::Expected {
                expected,
                found: other.cloned(),
                offset: self.offset(),
            }),
        }
    }

    /// Parses a sequence of items until the given `stop` condition.
    fn parse_items(&mut self, stop: Stop) -> Result<Vec<MacroItem>, MacroSyntaxError> {
        let mut items = Vec::new();
        loop {
            match stop {
                Stop::RParen if matches!(self.peek(), Some(MacroToken::RParen)) => return Ok(items),
                Stop::Semicolon if matches!(self.peek(), Some(MacroToken::Semicolon)) => return Ok(items),
                _ => {}
            }
            let Some(tok) = self.peek().cloned() else {
                if stop == Stop::Eof {
                    return Ok(items);
                }
                return Err(MacroSyntaxError::UnexpectedEof);
            };
            if let Some(op) = tok.raw_op() {
                self.pos += 1;
                items.push(MacroItem::Raw(op));
                continue;
            }
            match tok {
                MacroToken::Number(n) => {
                    self.pos += 1;
                    items.push(self.parse_counted(n as u32)?);
                }
                MacroToken::Ident(name) => {
                    self.pos += 1;
                    items.push(self.parse_call(name)?);
                }
                MacroToken::At => {
                    return Err(MacroSyntaxError::Expected {
                        expected: "a repetition count before `@`",
                        found: Some(MacroToken::At),
                        offset: self.offset(),
                    });
                }
                other => {
                    return Err(MacroSyntaxError::Expected {
                        expected: "an instruction, number, or identifier",
                        found: Some(other),
                        offset: self.offset(),
                    });
                }
            }
        }
    }

    /// Parses what follows a leading repetition count: a counted invocation
    /// (`3@name(args)`), an uncounted-block repeat (`5repeat(...)`), or a
    /// bare raw op (`5+`).
    fn parse_counted(&mut self, count: u32) -> Result<MacroItem, MacroSyntaxError> {
        if matches!(self.peek(), Some(MacroToken::At)) {
            self.pos += 1;
            let name = match self.bump() {
                Some(MacroToken::Ident(name)) => name,
                other => {
                    return Err(MacroSyntaxError::Expected {
                        expected: "a macro name after `@`",
                        found: other,
                        offset: self.offset(),
                    })
                }
            };
            let args = self.parse_args()?;
            return Ok(MacroItem::RepeatCall { count, name, args });
        }
        if matches!(self.peek(), Some(MacroToken::Ident(name)) if name == "repeat") {
            self.pos += 1;
            self.expect("(", |t| matches!(t, MacroToken::LParen))?;
            let body = self.parse_items(Stop::RParen)?;
            self.expect(")", |t| matches!(t, MacroToken::RParen))?;
            return Ok(MacroItem::Repeat(count, body));
        }
        let tok = self
            .bump()
            .ok_or(MacroSyntaxError::UnexpectedEof)?;
        let op = tok.raw_op().ok_or_else(|| MacroSyntaxError::Expected {
            expected: "a raw instruction, `repeat`, or `@` after a repetition count",
            found: Some(tok.clone()),
            offset: self.offset(),
        })?;
        Ok(MacroItem::RepeatRaw(count, op))
    }

    fn parse_call(&mut self, name: String) -> Result<MacroItem, MacroSyntaxError> {
        if name == "mem" {
            self.expect("(", |t| matches!(t, MacroToken::LParen))?;
            let body = self.parse_items(Stop::RParen)?;
            self.expect(")", |t| matches!(t, MacroToken::RParen))?;
            return Ok(MacroItem::Mem(body));
        }
        if name == "repeat" {
            self.expect("(", |t| matches!(t, MacroToken::LParen))?;
            let body = self.parse_items(Stop::RParen)?;
            self.expect(")", |t| matches!(t, MacroToken::RParen))?;
            return Ok(MacroItem::Repeat(1, body));
        }
        if name == "while" {
            self.expect("(", |t| matches!(t, MacroToken::LParen))?;
            let prefix = self.parse_items(Stop::Semicolon)?;
            self.expect(";", |t| matches!(t, MacroToken::Semicolon))?;
            let body = self.parse_items(Stop::RParen)?;
            self.expect(")", |t| matches!(t, MacroToken::RParen))?;
            return Ok(MacroItem::While { prefix, body });
        }
        if name == "ifel" {
            self.expect("(", |t| matches!(t, MacroToken::LParen))?;
            let then_branch = self.parse_items(Stop::Semicolon)?;
            self.expect(";", |t| matches!(t, MacroToken::Semicolon))?;
            let else_branch = self.parse_items(Stop::RParen)?;
            self.expect(")", |t| matches!(t, MacroToken::RParen))?;
            return Ok(MacroItem::IfEl { then_branch, else_branch });
        }
        let args = self.parse_args()?;
        Ok(MacroItem::Call { name, args })
    }

    fn parse_args(&mut self) -> Result<Vec<i128>, MacroSyntaxError> {
        self.expect("(", |t| matches!(t, MacroToken::LParen))?;
        let mut args = Vec::new();
        if matches!(self.peek(), Some(MacroToken::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            match self.bump() {
                Some(MacroToken::Number(n)) => args.push(n),
                other => {
                    return Err(MacroSyntaxError::Expected {
                        expected: "a numeric argument",
                        found: other,
                        offset: self.offset(),
                    })
                }
            }
            match self.bump() {
                Some(MacroToken::Semicolon) => continue,
                Some(MacroToken::RParen) => break,
                other => {
                    return Err(MacroSyntaxError::Expected {
                        expected: "`;` or `)`",
                        found: other,
                        offset: self.offset(),
                    })
                }
            }
        }
        Ok(args)
    }
}

pub fn parse(source: &str) -> Result<Vec<MacroItem>, MacroSyntaxError> {
    MacroParser::new(source).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_raw_ops() {
        let items = parse("+++[-]").unwrap();
        assert_eq!(
            items,
            vec![
                MacroItem::Raw(Instr::Inc),
                MacroItem::Raw(Instr::Inc),
                MacroItem::Raw(Instr::Inc),
                MacroItem::Raw(Instr::JumpIfZero),
                MacroItem::Raw(Instr::Dec),
                MacroItem::Raw(Instr::JumpIfNonzero),
            ]
        );
    }

    #[test]
    fn parses_counted_raw_op() {
        let items = parse("5+").unwrap();
        assert_eq!(items, vec![MacroItem::RepeatRaw(5, Instr::Inc)]);
    }

    #[test]
    fn parses_call_with_args() {
        let items = parse("implant(1;65)").unwrap();
        assert_eq!(
            items,
            vec![MacroItem::Call {
                name: "implant".to_string(),
                args: vec![1, 65],
            }]
        );
    }

    #[test]
    fn parses_counted_call() {
        let items = parse("3@copy(4)").unwrap();
        assert_eq!(
            items,
            vec![MacroItem::RepeatCall {
                count: 3,
                name: "copy".to_string(),
                args: vec![4],
            }]
        );
    }

    #[test]
    fn parses_mem_region() {
        let items = parse("mem(>>+<<)").unwrap();
        assert_eq!(
            items,
            vec![MacroItem::Mem(vec![
                MacroItem::Raw(Instr::Right),
                MacroItem::Raw(Instr::Right),
                MacroItem::Raw(Instr::Inc),
                MacroItem::Raw(Instr::Left),
                MacroItem::Raw(Instr::Left),
            ])]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let items = parse("+ # bump the cell\n-").unwrap();
        assert_eq!(items, vec![MacroItem::Raw(Instr::Inc), MacroItem::Raw(Instr::Dec)]);
    }

    #[test]
    fn parses_counted_repeat_block() {
        let items = parse("3repeat(<[-])").unwrap();
        assert_eq!(
            items,
            vec![MacroItem::Repeat(
                3,
                vec![
                    MacroItem::Raw(Instr::Left),
                    MacroItem::Raw(Instr::JumpIfZero),
                    MacroItem::Raw(Instr::Dec),
                    MacroItem::Raw(Instr::JumpIfNonzero),
                ]
            )]
        );
    }

    #[test]
    fn parses_while_with_prefix_and_body() {
        let items = parse("while(copybinx(1;0);+)").unwrap();
        assert_eq!(
            items,
            vec![MacroItem::While {
                prefix: vec![MacroItem::Call {
                    name: "copybinx".to_string(),
                    args: vec![1, 0],
                }],
                body: vec![MacroItem::Raw(Instr::Inc)],
            }]
        );
    }

    #[test]
    fn parses_ifel_with_both_branches() {
        let items = parse("boolbinx(1)ifel(+;-)").unwrap();
        assert_eq!(
            items,
            vec![
                MacroItem::Call {
                    name: "boolbinx".to_string(),
                    args: vec![1],
                },
                MacroItem::IfEl {
                    then_branch: vec![MacroItem::Raw(Instr::Inc)],
                    else_branch: vec![MacroItem::Raw(Instr::Dec)],
                },
            ]
        );
    }
}
