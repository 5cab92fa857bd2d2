use crate::token::Token;

/// Concrete syntax tree node: either a consumed token, or a named rule
/// application wrapping its ordered children. Tagged sum type per the design
/// notes — all downstream passes (the cleaner, the processor) match
/// exhaustively on this enum rather than relying on dynamic dispatch.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CstNode {
    Leaf(Token),
    Nonterminal { rule: String, children: Vec<CstNode> },
}

impl CstNode {
    pub fn nonterminal(rule: impl Into<String>, children: Vec<CstNode>) -> Self {
        CstNode::Nonterminal {
            rule: rule.into(),
            children,
        }
    }

    pub fn rule_name(&self) -> Option<&str> {
        match self {
            CstNode::Nonterminal { rule, .. } => Some(rule),
            CstNode::Leaf(_) => None,
        }
    }

    pub fn children(&self) -> &[CstNode] {
        match self {
            CstNode::Nonterminal { children, .. } => children,
            CstNode::Leaf(_) => &[],
        }
    }

    pub fn as_leaf(&self) -> Option<&Token> {
        match self {
            CstNode::Leaf(token) => Some(token),
            CstNode::Nonterminal { .. } => None,
        }
    }

    pub fn is_rule(&self, name: &str) -> bool {
        self.rule_name() == Some(name)
    }
}
