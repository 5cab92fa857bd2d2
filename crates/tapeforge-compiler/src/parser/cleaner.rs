//! Rewrites right-recursive tail productions into left-associative binary
//! trees. Grounded on `examples/original_source/VarfuckTranspiler.py`'s
//! `Cleaner` class: the grammar encodes `const_expr := term (op term)*` as
//! `const_expr := term const_expr_p` with `const_expr_p := op term
//! const_expr_p | ε`, and this pass collapses that tail-recursive shape into
//! the three-child `(left, op, right)` tree `constexpr::build_from_ast`
//! expects.

use tapeforge_core::CstNode;

/// Cleans a full parse tree rooted at `grammar`, collapsing every
/// `const_expr`/`const_expr_p` pair it finds anywhere in the tree.
pub fn clean(tree: CstNode) -> CstNode {
    clean_node(tree)
}

fn clean_node(node: CstNode) -> CstNode {
    match node {
        CstNode::Leaf(_) => node,
        CstNode::Nonterminal { rule, children } if rule == "const_expr" => correct_const_expr(&rule, children),
        CstNode::Nonterminal { rule, children } => {
            CstNode::nonterminal(rule, children.into_iter().map(clean_node).collect())
        }
    }
}

/// Mirrors `__correct_const_expr`: walks the `const_expr`/`const_expr_p`
/// spine, folding the trailing tail into a left-associative binary tree.
fn correct_const_expr(rule: &str, children: Vec<CstNode>) -> CstNode {
    if rule == "const_expr_p" {
        if children.is_empty() {
            return CstNode::nonterminal("temp", Vec::new());
        }
        return CstNode::nonterminal(
            "temp",
            children.into_iter().map(|c| correct_const_expr_dispatch(c)).collect(),
        );
    }

    let last = children.last().expect("const_expr node must have at least one child");
    let tail = correct_const_expr_dispatch(last.clone());
    let tail_children = tail.children().to_vec();

    if tail_children.is_empty() {
        let head: Vec<CstNode> = children[..children.len() - 1]
            .iter()
            .cloned()
            .map(correct_const_expr_dispatch)
            .collect();
        return CstNode::nonterminal("const_expr", head);
    }

    let head: Vec<CstNode> = children[..children.len() - 1]
        .iter()
        .cloned()
        .map(correct_const_expr_dispatch)
        .collect();
    let op = tail_children[0].clone();
    let right = tail_children[1].clone();
    CstNode::nonterminal(
        "const_expr",
        vec![CstNode::nonterminal("const_expr", head), op, right],
    )
}

fn correct_const_expr_dispatch(node: CstNode) -> CstNode {
    match node {
        CstNode::Leaf(_) => node,
        CstNode::Nonterminal { rule, children } => correct_const_expr(&rule, children),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapeforge_core::{Token, TokenKind};

    fn leaf(kind: TokenKind, text: &str) -> CstNode {
        CstNode::Leaf(Token::new(kind, text))
    }

    #[test]
    fn single_term_stays_a_single_child() {
        // const_expr := term const_expr_p, const_expr_p := ε
        let tree = CstNode::nonterminal(
            "const_expr",
            vec![leaf(TokenKind::Number, "4"), CstNode::nonterminal("const_expr_p", Vec::new())],
        );
        let cleaned = clean(tree);
        match cleaned {
            CstNode::Nonterminal { rule, children } => {
                assert_eq!(rule, "const_expr");
                assert_eq!(children.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn one_trailing_operator_becomes_a_three_child_tree() {
        // 4 + 2  =>  const_expr(const_expr(4), "+", 2)
        let tail = CstNode::nonterminal(
            "const_expr_p",
            vec![
                leaf(TokenKind::Operator, "+"),
                leaf(TokenKind::Number, "2"),
                CstNode::nonterminal("const_expr_p", Vec::new()),
            ],
        );
        let tree = CstNode::nonterminal("const_expr", vec![leaf(TokenKind::Number, "4"), tail]);
        let cleaned = clean(tree);
        match cleaned {
            CstNode::Nonterminal { rule, children } => {
                assert_eq!(rule, "const_expr");
                assert_eq!(children.len(), 3);
                assert_eq!(children[1], leaf(TokenKind::Operator, "+"));
                assert_eq!(children[2], leaf(TokenKind::Number, "2"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
