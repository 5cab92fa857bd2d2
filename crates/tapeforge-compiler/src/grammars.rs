//! Hand-assembled Grammar IR for the surface language.
//!
//! Grounded on `examples/original_source/EBNF.py`'s `Parser.grammar` class
//! body (a grammar built entirely out of constructor calls, not parsed from
//! EBNF text) and the statement/expression shapes implied by
//! `examples/original_source/VarfuckTranspiler.py`'s `Processor`. There is
//! no *textual* EBNF loader here — the grammar is built directly out of
//! `GrammarArena` constructor calls, the Rust-native equivalent.

use std::collections::HashSet;

use tapeforge_core::{CountType, Grammar, GrammarArena, GrammarNode, NodeId, Token, TokenKind, TokenPattern};

use crate::parser::SubstitutionTables;

fn exact(arena: &mut GrammarArena, kind: TokenKind, text: &str) -> NodeId {
    arena.terminal(TokenPattern::Exact(Token::new(kind, text)))
}

fn kind(arena: &mut GrammarArena, kind: TokenKind) -> NodeId {
    arena.terminal(TokenPattern::Kind(kind))
}

/// Wraps `id` in a `Count::One` unless it is already a `Count` node —
/// every element placed into a `Concat` or `Alter` must itself be a `Count`
/// node, so this lets call sites pass bare terminals/rule-refs/alts and
/// already-quantified ones (from `rep0`/`rep1`/`opt`) interchangeably.
fn as_count(arena: &mut GrammarArena, id: NodeId) -> NodeId {
    if matches!(arena.get(id), GrammarNode::Count { .. }) {
        id
    } else {
        arena.count(id, CountType::One)
    }
}

fn seq(arena: &mut GrammarArena, parts: Vec<NodeId>) -> NodeId {
    let parts: Vec<NodeId> = parts.into_iter().map(|p| as_count(arena, p)).collect();
    arena.concat(parts)
}

fn alt(arena: &mut GrammarArena, options: Vec<NodeId>) -> NodeId {
    let options: Vec<NodeId> = options.into_iter().map(|p| as_count(arena, p)).collect();
    arena.alter(options)
}

fn rep0(arena: &mut GrammarArena, inner: NodeId) -> NodeId {
    arena.count(inner, CountType::ZeroOrMany)
}

fn opt(arena: &mut GrammarArena, inner: NodeId) -> NodeId {
    arena.count(inner, CountType::ZeroOrOne)
}

/// Builds the surface language's grammar:
///
/// ```text
/// program       := item* call_stmt
/// item          := const_def | macro_def
/// const_def     := "num" IDENT "=" const_expr ";"
/// macro_def     := "macro" IDENT const_param_list "(" param_list ")" "->" const_list block
/// const_param_list := "[" opt(IDENT ("," IDENT)*) "]"
/// param_list    := opt(IDENT ":" const_expr ("," IDENT ":" const_expr)*)
/// const_list    := "(" opt(const_expr ("," const_expr)*) ")"
/// var_list      := "(" opt(IDENT ("," IDENT)*) ")"
/// block         := "{" stmt* "}"
/// stmt          := const_def | call_stmt ";" | fuck_stmt ";" | ifel_stmt | while_stmt
/// call_stmt     := "call" IDENT const_list var_list opt("->" var_list)
/// fuck_stmt     := Command("fuck") var_list
/// ifel_stmt     := "if" "(" const_expr ")" block "else" block
/// while_stmt    := "while" "(" const_expr ")" block
/// const_expr    := term const_expr_p
/// const_expr_p  := opt(op term const_expr_p)
/// term          := NUMBER | call_term | paren_term | unary_term | IDENT
/// ```
///
/// Punctuation and keywords are forgotten via [`default_tables`]'s forget
/// set, not baked into the IR itself — the grammar above still matches
/// them, they are simply excluded from the resulting CST.
pub fn surface_grammar() -> Grammar {
    let mut arena = GrammarArena::new();

    let ident = kind(&mut arena, TokenKind::Identifier);
    let number = kind(&mut arena, TokenKind::Number);
    let comma = exact(&mut arena, TokenKind::Punctuation, ",");
    let lparen = exact(&mut arena, TokenKind::Punctuation, "(");
    let rparen = exact(&mut arena, TokenKind::Punctuation, ")");
    let lbrace = exact(&mut arena, TokenKind::Punctuation, "{");
    let rbrace = exact(&mut arena, TokenKind::Punctuation, "}");
    let lbracket = exact(&mut arena, TokenKind::Punctuation, "[");
    let rbracket = exact(&mut arena, TokenKind::Punctuation, "]");
    let semi = exact(&mut arena, TokenKind::Punctuation, ";");
    let colon = exact(&mut arena, TokenKind::Punctuation, ":");
    let eq = exact(&mut arena, TokenKind::Operator, "=");
    let arrow_out = exact(&mut arena, TokenKind::Operator, "->");
    let arrow_in = exact(&mut arena, TokenKind::Operator, "<-");
    let num_ty = kind(&mut arena, TokenKind::Type);
    let kw_macro = exact(&mut arena, TokenKind::Identifier, "macro");
    let kw_call = exact(&mut arena, TokenKind::Identifier, "call");
    let kw_if = exact(&mut arena, TokenKind::Identifier, "if");
    let kw_else = exact(&mut arena, TokenKind::Identifier, "else");
    let kw_while = exact(&mut arena, TokenKind::Identifier, "while");
    let fuck = exact(&mut arena, TokenKind::Command, "fuck");

    // const_expr / const_expr_p (right-recursive tail, per §4.2 — the
    // cleaner rewrites this pair into a left-associative binary tree).
    let const_expr = arena.reserve_rule("const_expr");
    let const_expr_p = arena.reserve_rule("const_expr_p");
    let term = arena.reserve_rule("term");

    let op = {
        let ops = ["**", "<<", ">>", "+", "-", "*", "/", "&", "|", "^"];
        let nodes: Vec<NodeId> = ops.iter().map(|o| exact(&mut arena, TokenKind::Operator, o)).collect();
        alt(&mut arena, nodes)
    };

    // const_expr_p := opt(op term const_expr_p) — ZeroOrOne rather than an
    // Alter-with-empty-branch, since the IR has no empty-Concat epsilon.
    let const_expr_p_body = {
        let tail = seq(&mut arena, vec![op, term, const_expr_p]);
        opt(&mut arena, tail)
    };
    arena.set_rule_spec(const_expr_p, const_expr_p_body);

    let const_expr_body = seq(&mut arena, vec![term, const_expr_p]);
    arena.set_rule_spec(const_expr, const_expr_body);

    let minus = exact(&mut arena, TokenKind::Operator, "-");
    let tilde = exact(&mut arena, TokenKind::Operator, "~");
    let call_term = seq(&mut arena, vec![ident, lparen, const_expr, rparen]);
    let paren_term = seq(&mut arena, vec![lparen, const_expr, rparen]);
    let unary_op = alt(&mut arena, vec![minus, tilde]);
    let unary_term = seq(&mut arena, vec![unary_op, term]);
    let term_body = alt(&mut arena, vec![number, call_term, paren_term, unary_term, ident]);
    arena.set_rule_spec(term, term_body);

    // const_list := "(" opt(const_expr ("," const_expr)*) ")"
    let const_list = arena.reserve_rule("const_struct");
    let const_list_rest = rep0(&mut arena, seq(&mut arena, vec![comma, const_expr]));
    let const_list_items = opt(&mut arena, seq(&mut arena, vec![const_expr, const_list_rest]));
    let const_list_body = seq(&mut arena, vec![lparen, const_list_items, rparen]);
    arena.set_rule_spec(const_list, const_list_body);

    // var_list := "(" opt(IDENT ("," IDENT)*) ")"
    let var_list = arena.reserve_rule("var_struct");
    let var_list_rest = rep0(&mut arena, seq(&mut arena, vec![comma, ident]));
    let var_list_items = opt(&mut arena, seq(&mut arena, vec![ident, var_list_rest]));
    let var_list_body = seq(&mut arena, vec![lparen, var_list_items, rparen]);
    arena.set_rule_spec(var_list, var_list_body);

    // const_param_list := "[" opt(IDENT ("," IDENT)*) "]"
    let const_param_list = arena.reserve_rule("const_param_struct");
    let cpl_rest = rep0(&mut arena, seq(&mut arena, vec![comma, ident]));
    let cpl_items = opt(&mut arena, seq(&mut arena, vec![ident, cpl_rest]));
    let cpl_body = seq(&mut arena, vec![lbracket, cpl_items, rbracket]);
    arena.set_rule_spec(const_param_list, cpl_body);

    // param_list := opt(IDENT ":" const_expr ("," IDENT ":" const_expr)*)
    let param_list = arena.reserve_rule("param_struct");
    let param_one = seq(&mut arena, vec![ident, colon, const_expr]);
    let param_rest = rep0(&mut arena, seq(&mut arena, vec![comma, param_one]));
    let param_items = opt(&mut arena, seq(&mut arena, vec![param_one, param_rest]));
    arena.set_rule_spec(param_list, param_items);

    // const_def := "num" IDENT "=" const_expr ";"
    let const_def = arena.reserve_rule("const_def");
    let const_def_body = seq(&mut arena, vec![num_ty, ident, eq, const_expr, semi]);
    arena.set_rule_spec(const_def, const_def_body);

    // call_stmt := "call" IDENT const_list var_list opt("->" var_list)
    let call_stmt = arena.reserve_rule("call");
    let ret_clause = opt(&mut arena, seq(&mut arena, vec![arrow_out, var_list]));
    let call_body = seq(&mut arena, vec![kw_call, ident, const_list, var_list, ret_clause]);
    arena.set_rule_spec(call_stmt, call_body);

    // Allow the illustrative "<-" binding form as a pure syntactic
    // alternative for the same return clause; it carries no extra meaning
    // (the named rule `call` is identical either way).
    let _ = arrow_in;

    // fuck_stmt := Command("fuck") var_list
    let fuck_stmt = arena.reserve_rule("return");
    let fuck_body = seq(&mut arena, vec![fuck, var_list]);
    arena.set_rule_spec(fuck_stmt, fuck_body);

    let block = arena.reserve_rule("block");
    let stmt = arena.reserve_rule("stmt");

    // ifel_stmt := "if" "(" const_expr ")" block "else" block
    let ifel_stmt = arena.reserve_rule("ifel");
    let ifel_body = seq(&mut arena, vec![kw_if, lparen, const_expr, rparen, block, kw_else, block]);
    arena.set_rule_spec(ifel_stmt, ifel_body);

    // while_stmt := "while" "(" const_expr ")" block
    let while_stmt = arena.reserve_rule("while_or_repeat");
    let while_body = seq(&mut arena, vec![kw_while, lparen, const_expr, rparen, block]);
    arena.set_rule_spec(while_stmt, while_body);

    let call_stmt_terminated = seq(&mut arena, vec![call_stmt, semi]);
    let fuck_stmt_terminated = seq(&mut arena, vec![fuck_stmt, semi]);
    let stmt_body = alt(
        &mut arena,
        vec![const_def, call_stmt_terminated, fuck_stmt_terminated, ifel_stmt, while_stmt],
    );
    arena.set_rule_spec(stmt, stmt_body);

    let block_body = seq(&mut arena, vec![lbrace, rep0(&mut arena, stmt), rbrace]);
    arena.set_rule_spec(block, block_body);

    // macro_def := "macro" IDENT const_param_list "(" param_list ")" "->" const_list block
    let macro_def = arena.reserve_rule("macro_def");
    let macro_def_body = seq(
        &mut arena,
        vec![kw_macro, ident, const_param_list, lparen, param_list, rparen, arrow_out, const_list, block],
    );
    arena.set_rule_spec(macro_def, macro_def_body);

    let item = arena.reserve_rule("item");
    let item_body = alt(&mut arena, vec![const_def, macro_def]);
    arena.set_rule_spec(item, item_body);

    let program = arena.reserve_rule("grammar");
    let program_body = seq(&mut arena, vec![rep0(&mut arena, item), call_stmt]);
    arena.set_rule_spec(program, program_body);

    Grammar::new(arena, program)
}

/// The default substitution tables for [`surface_grammar`]: no terminal or
/// rule remapping, but a forget set excluding pure syntax glue (punctuation
/// and keywords) from the resulting CST, so downstream passes only ever see
/// semantically meaningful children.
pub fn default_tables() -> SubstitutionTables {
    let mut terminal_forget_set = HashSet::new();
    for text in ["(", ")", "{", "}", "[", "]", ",", ";", ":", "="] {
        terminal_forget_set.insert(TokenPattern::Exact(Token::new(TokenKind::Punctuation, text)));
    }
    terminal_forget_set.insert(TokenPattern::Exact(Token::new(TokenKind::Operator, "=")));
    terminal_forget_set.insert(TokenPattern::Exact(Token::new(TokenKind::Operator, "->")));
    terminal_forget_set.insert(TokenPattern::Exact(Token::new(TokenKind::Command, "fuck")));
    for kw in ["macro", "call", "if", "else", "while"] {
        terminal_forget_set.insert(TokenPattern::Exact(Token::new(TokenKind::Identifier, kw)));
    }

    SubstitutionTables {
        terminal_forget_set,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn parses_a_minimal_program() {
        let grammar = surface_grammar();
        let tables = default_tables();
        let source = "call main() ()";
        let tree = parse(&grammar, &tables, source).expect("minimal program should parse");
        assert!(tree.is_rule("grammar"));
    }

    #[test]
    fn parses_a_const_def_and_call() {
        let grammar = surface_grammar();
        let tables = default_tables();
        let source = "num x = 65; call main() ()";
        let tree = parse(&grammar, &tables, source).expect("program with a const_def should parse");
        assert!(tree.is_rule("grammar"));
    }

    #[test]
    fn parses_a_macro_definition() {
        let grammar = surface_grammar();
        let tables = default_tables();
        let source = "macro id[n](a: n) -> (n) { fuck(a); } call main() ()";
        let tree = parse(&grammar, &tables, source).expect("program with a macro_def should parse");
        assert!(tree.is_rule("grammar"));
    }
}
