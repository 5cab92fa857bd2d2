//! Deferred compile-time integer expression algebra.
//!
//! Grounded on `examples/original_source/VarfuckTranspiler.py`'s `ConstExpr`:
//! a token list (literal text or a named reference) that stays symbolic until
//! every reference has been substituted away, at which point it is rendered
//! by evaluating the accumulated expression. The source renders by handing
//! the joined token string to Python's `eval`; here the same token list is
//! evaluated by a small recursive-descent integer evaluator (see
//! `eval_tokens` below), fixing numeric semantics to `i128`, truncating
//! division, and checked exponentiation per the decisions recorded in
//! `DESIGN.md`.

use std::collections::BTreeSet;
use std::fmt;

use tapeforge_core::{CstNode, Token, TokenKind};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExprTok {
    /// A literal fragment of the target expression language: a number, an
    /// operator, a paren, or a math-function name + `(`/`)`.
    Lit(String),
    /// A symbolic reference awaiting substitution.
    Ref(String),
}

/// A compile-time expression that may still contain unresolved references.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConstExpr {
    data: Vec<ExprTok>,
    force_nnint: bool,
}

impl ConstExpr {
    pub fn literal(value: i128) -> Self {
        ConstExpr {
            data: vec![ExprTok::Lit(value.to_string())],
            force_nnint: false,
        }
    }

    pub fn from_tokens(data: Vec<ExprTok>, force_nnint: bool) -> Self {
        ConstExpr { data, force_nnint }
    }

    pub fn with_nnint(mut self, force: bool) -> Self {
        self.force_nnint = force;
        self
    }

    fn refs(&self) -> BTreeSet<&str> {
        self.data
            .iter()
            .filter_map(|t| match t {
                ExprTok::Ref(name) => Some(name.as_str()),
                ExprTok::Lit(_) => None,
            })
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.refs().is_empty()
    }

    /// `Some(name)` if this expression is exactly one bare reference and
    /// nothing else — the shape an `ifel`/`while_or_repeat` condition must
    /// have to be treated as "a single reference to a live variable".
    pub fn as_bare_reference(&self) -> Option<String> {
        match self.data.as_slice() {
            [ExprTok::Ref(name)] => Some(name.clone()),
            _ => None,
        }
    }

    /// `(b + a)`, matching the source's `ConstExpr.__add__` argument order
    /// (`other.data + ["+"] + self.data`).
    pub fn add(&self, other: &ConstExpr) -> ConstExpr {
        let mut data = other.data.clone();
        data.push(ExprTok::Lit("+".to_string()));
        data.extend(self.data.clone());
        ConstExpr {
            data,
            force_nnint: self.force_nnint || other.force_nnint,
        }
    }

    /// `(a - (b))`.
    pub fn sub(&self, other: &ConstExpr) -> ConstExpr {
        let mut data = self.data.clone();
        data.push(ExprTok::Lit("-(".to_string()));
        data.extend(other.data.clone());
        data.push(ExprTok::Lit(")".to_string()));
        ConstExpr {
            data,
            force_nnint: self.force_nnint || other.force_nnint,
        }
    }

    pub fn replace(&self, name: &str, value: &ConstExpr) -> ConstExpr {
        if !self.refs().contains(name) {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.data.len());
        for tok in &self.data {
            match tok {
                ExprTok::Ref(n) if n == name => data.extend(value.data.clone()),
                other => data.push(other.clone()),
            }
        }
        ConstExpr {
            data,
            force_nnint: self.force_nnint,
        }
    }

    /// Evaluates a fully-ground expression to its canonical decimal string.
    pub fn render_string(&self) -> Result<String> {
        if !self.is_done() {
            return Err(Error::Value(format!(
                "ConstExpr hasn't been fully built ({:?}).",
                self.data
            )));
        }
        let value = eval_tokens(&self.data)?;
        if self.force_nnint && value < 0 {
            return Err(Error::Value(format!(
                "ConstExpr's forced non-negative integer, instead got {value}."
            )));
        }
        Ok(value.to_string())
    }

    pub fn render_i128(&self) -> Result<i128> {
        self.render_string().map(|s| s.parse().expect("render_string yields a valid integer"))
    }

    /// Converts a cleaned `const_expr` CST node into a ConstExpr, per
    /// `ConstExpr.__builder` in the source.
    pub fn build_from_ast(node: &CstNode) -> Result<ConstExpr> {
        Ok(ConstExpr {
            data: builder(node)?,
            force_nnint: false,
        })
    }
}

impl fmt::Display for ConstExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render_string() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<unresolved const-expr>"),
        }
    }
}

const UNARY_FUNCTIONS: &[&str] = &["abs", "floor", "ceil", "sqrt"];

fn builder(node: &CstNode) -> Result<Vec<ExprTok>> {
    match node {
        CstNode::Leaf(token) => Ok(vec![leaf_token(token)?]),
        CstNode::Nonterminal { children, .. } => {
            if children.is_empty() {
                return Err(Error::syntax("empty const-expr node"));
            }
            if let Some(tok) = children[0].as_leaf() {
                if tok.kind == TokenKind::Number {
                    return Ok(vec![ExprTok::Lit(tok.text.clone())]);
                }
                if tok.kind == TokenKind::Operator {
                    // unary operator: op followed by its operand
                    let mut out = vec![ExprTok::Lit(tok.text.clone())];
                    out.extend(builder(&children[1])?);
                    return Ok(out);
                }
                if children.len() == 1 {
                    return Ok(vec![ExprTok::Ref(tok.text.clone())]);
                }
                // call form: name(arg)
                let mut out = vec![ExprTok::Lit(format!("{}(", tok.text))];
                out.extend(builder(&children[1])?);
                out.push(ExprTok::Lit(")".to_string()));
                return Ok(out);
            }
            if children.len() == 1 {
                let mut out = vec![ExprTok::Lit("(".to_string())];
                out.extend(builder(&children[0])?);
                out.push(ExprTok::Lit(")".to_string()));
                return Ok(out);
            }
            // binary: left op right
            let mut out = builder(&children[0])?;
            let op = children[1]
                .as_leaf()
                .ok_or_else(|| Error::syntax("expected an operator token in const-expr"))?;
            out.push(ExprTok::Lit(op.text.clone()));
            out.extend(builder(&children[2])?);
            Ok(out)
        }
    }
}

fn leaf_token(token: &Token) -> Result<ExprTok> {
    match token.kind {
        TokenKind::Number => Ok(ExprTok::Lit(token.text.clone())),
        TokenKind::Identifier => Ok(ExprTok::Ref(token.text.clone())),
        _ => Err(Error::syntax(format!("unexpected token in const-expr: {token}"))),
    }
}

/// Recursive-descent evaluator over the token list: standard precedence
/// `**` > unary `- ~` > `* /` > `+ -` > `<< >>` > `&` > `^` > `|`, with
/// parens and `name(arg)` calls from [`UNARY_FUNCTIONS`].
fn eval_tokens(tokens: &[ExprTok]) -> Result<i128> {
    let flat = flatten(tokens)?;
    let mut p = EvalCursor { toks: &flat, pos: 0 };
    let value = p.parse_or()?;
    if p.pos != p.toks.len() {
        return Err(Error::Value("trailing tokens in const-expr".to_string()));
    }
    Ok(value)
}

/// Splits each `ExprTok::Lit` on internal boundaries (e.g. a fragment like
/// `"-("` must become the two lexical tokens `-` and `(`) so the evaluator
/// below can work over single-symbol tokens.
fn flatten(tokens: &[ExprTok]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for tok in tokens {
        match tok {
            ExprTok::Ref(name) => {
                return Err(Error::Value(format!("const-expr still references `{name}`")))
            }
            ExprTok::Lit(text) => split_fragment(text, &mut out),
        }
    }
    Ok(out)
}

fn split_fragment(text: &str, out: &mut Vec<String>) {
    const MULTI: &[&str] = &["**", "<<", ">>"];
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &text[i..];
        if let Some(op) = MULTI.iter().find(|op| rest.starts_with(*op)) {
            out.push((*op).to_string());
            i += op.len();
            continue;
        }
        let c = rest.chars().next().unwrap();
        if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
            out.push(text[start..i].to_string());
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(text[start..i].to_string());
            continue;
        }
        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }
        out.push(c.to_string());
        i += c.len_utf8();
    }
}

struct EvalCursor<'a> {
    toks: &'a [String],
    pos: usize,
}

impl<'a> EvalCursor<'a> {
    fn peek(&self) -> Option<&str> {
        self.toks.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<String> {
        let t = self.toks.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<i128> {
        let mut left = self.parse_xor()?;
        while self.peek() == Some("|") {
            self.bump();
            left |= self.parse_xor()?;
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<i128> {
        let mut left = self.parse_and()?;
        while self.peek() == Some("^") {
            self.bump();
            left ^= self.parse_and()?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<i128> {
        let mut left = self.parse_shift()?;
        while self.peek() == Some("&") {
            self.bump();
            left &= self.parse_shift()?;
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<i128> {
        let mut left = self.parse_add()?;
        loop {
            match self.peek() {
                Some("<<") => {
                    self.bump();
                    let rhs = self.parse_add()?;
                    left = checked_shl(left, rhs)?;
                }
                Some(">>") => {
                    self.bump();
                    let rhs = self.parse_add()?;
                    left = checked_shr(left, rhs)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<i128> {
        let mut left = self.parse_mul()?;
        loop {
            match self.peek() {
                Some("+") => {
                    self.bump();
                    left = left
                        .checked_add(self.parse_mul()?)
                        .ok_or_else(|| Error::Value("const-expr addition overflowed".to_string()))?;
                }
                Some("-") => {
                    self.bump();
                    left = left
                        .checked_sub(self.parse_mul()?)
                        .ok_or_else(|| Error::Value("const-expr subtraction overflowed".to_string()))?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<i128> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some("*") => {
                    self.bump();
                    left = left
                        .checked_mul(self.parse_unary()?)
                        .ok_or_else(|| Error::Value("const-expr multiplication overflowed".to_string()))?;
                }
                Some("/") => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    if rhs == 0 {
                        return Err(Error::Value("const-expr division by zero".to_string()));
                    }
                    left /= rhs;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<i128> {
        match self.peek() {
            Some("-") => {
                self.bump();
                let v = self.parse_power()?;
                v.checked_neg().ok_or_else(|| Error::Value("const-expr negation overflowed".to_string()))
            }
            Some("~") => {
                self.bump();
                Ok(!self.parse_power()?)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<i128> {
        let base = self.parse_atom()?;
        if self.peek() == Some("**") {
            self.bump();
            let exp = self.parse_unary()?;
            return checked_pow(base, exp);
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<i128> {
        match self.bump() {
            Some(tok) if tok == "(" => {
                let v = self.parse_or()?;
                if self.bump().as_deref() != Some(")") {
                    return Err(Error::Value("unbalanced parens in const-expr".to_string()));
                }
                Ok(v)
            }
            Some(tok) if tok.chars().all(|c| c.is_ascii_digit()) => tok
                .parse()
                .map_err(|_| Error::Value(format!("not a valid integer literal: {tok}"))),
            Some(tok) if UNARY_FUNCTIONS.contains(&tok.as_str()) => {
                if self.bump().as_deref() != Some("(") {
                    return Err(Error::Value(format!("expected `(` after `{tok}`")));
                }
                let arg = self.parse_or()?;
                if self.bump().as_deref() != Some(")") {
                    return Err(Error::Value(format!("expected `)` closing `{tok}(`")));
                }
                Ok(match tok.as_str() {
                    "abs" => arg.abs(),
                    "floor" | "ceil" => arg,
                    "sqrt" => isqrt(arg)?,
                    _ => unreachable!(),
                })
            }
            other => Err(Error::Value(format!("unexpected token in const-expr: {other:?}"))),
        }
    }
}

fn isqrt(value: i128) -> Result<i128> {
    if value < 0 {
        return Err(Error::Value("sqrt of a negative const-expr".to_string()));
    }
    Ok((value as f64).sqrt() as i128)
}

fn checked_shl(lhs: i128, rhs: i128) -> Result<i128> {
    if !(0..128).contains(&rhs) {
        return Err(Error::Value("const-expr shift amount out of range".to_string()));
    }
    lhs.checked_shl(rhs as u32)
        .ok_or_else(|| Error::Value("const-expr left shift overflowed".to_string()))
}

fn checked_shr(lhs: i128, rhs: i128) -> Result<i128> {
    if !(0..128).contains(&rhs) {
        return Err(Error::Value("const-expr shift amount out of range".to_string()));
    }
    Ok(lhs >> rhs)
}

fn checked_pow(base: i128, exp: i128) -> Result<i128> {
    if exp < 0 {
        return Err(Error::Value("const-expr exponent must be non-negative".to_string()));
    }
    let exp: u32 = exp
        .try_into()
        .map_err(|_| Error::Value("const-expr exponent too large".to_string()))?;
    base.checked_pow(exp)
        .ok_or_else(|| Error::Value("const-expr exponentiation overflowed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_renders_itself() {
        let e = ConstExpr::literal(11);
        assert_eq!(e.render_string().unwrap(), "11");
    }

    #[test]
    fn add_and_sub_match_source_argument_order() {
        let a = ConstExpr::literal(3);
        let b = ConstExpr::literal(4);
        assert_eq!(a.add(&b).render_string().unwrap(), "7");
        assert_eq!(a.sub(&b).render_string().unwrap(), "-1");
    }

    #[test]
    fn replace_resolves_a_reference() {
        let expr = ConstExpr::from_tokens(
            vec![ExprTok::Ref("a".to_string()), ExprTok::Lit("+".to_string()), ExprTok::Lit("1".to_string())],
            false,
        );
        assert!(!expr.is_done());
        let resolved = expr.replace("a", &ConstExpr::literal(2));
        assert!(resolved.is_done());
        assert_eq!(resolved.render_string().unwrap(), "3");
    }

    #[test]
    fn force_nnint_rejects_negative_results() {
        let expr = ConstExpr::literal(1).sub(&ConstExpr::literal(5)).with_nnint(true);
        assert!(expr.render_string().is_err());
    }

    #[test]
    fn operator_precedence_and_parens() {
        let expr = ConstExpr::from_tokens(
            vec![
                ExprTok::Lit("(".to_string()),
                ExprTok::Lit("2".to_string()),
                ExprTok::Lit("+".to_string()),
                ExprTok::Lit("3".to_string()),
                ExprTok::Lit(")".to_string()),
                ExprTok::Lit("*".to_string()),
                ExprTok::Lit("4".to_string()),
            ],
            false,
        );
        assert_eq!(expr.render_string().unwrap(), "20");
    }

    #[test]
    fn division_by_zero_is_a_value_error() {
        let expr = ConstExpr::from_tokens(
            vec![ExprTok::Lit("1".to_string()), ExprTok::Lit("/".to_string()), ExprTok::Lit("0".to_string())],
            false,
        );
        assert!(expr.render_string().is_err());
    }

    #[test]
    fn exponent_overflow_is_a_value_error() {
        let expr = ConstExpr::from_tokens(
            vec![ExprTok::Lit("2".to_string()), ExprTok::Lit("**".to_string()), ExprTok::Lit("200".to_string())],
            false,
        );
        assert!(expr.render_string().is_err());
    }
}
