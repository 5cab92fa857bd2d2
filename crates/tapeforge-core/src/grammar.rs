use crate::token::TokenPattern;

/// Cardinality of a `Count` node, mirroring the four repetition forms the
/// grammar IR supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CountType {
    ZeroOrOne,
    ZeroOrMany,
    One,
    OneOrMany,
}

/// Index into a `GrammarArena`. Grammar nodes reference each other by index
/// rather than by owning pointer so that `RuleRef` cycles (mutually and
/// self-recursive rules) never require reference counting or unsafe cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single node of the grammar intermediate representation: one of the
/// five kinds `Terminal`, `RuleRef`, `Concat`, `Alter`, `Count`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum GrammarNode {
    Terminal(TokenPattern),
    RuleRef {
        name: String,
        /// `None` until the rule's production is attached; grammars are
        /// built in two steps (reserve the `RuleRef`, then fill in `spec`)
        /// precisely to allow forward/self/mutual references.
        spec: Option<NodeId>,
    },
    Concat(Vec<NodeId>),
    Alter(Vec<NodeId>),
    Count {
        inner: NodeId,
        count_type: CountType,
    },
}

/// Owns every grammar node ever constructed for a given grammar. Immutable
/// once construction finishes; grammars built once are reused across many
/// parser invocations.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct GrammarArena {
    nodes: Vec<GrammarNode>,
}

impl GrammarArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: GrammarNode) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn terminal(&mut self, pattern: TokenPattern) -> NodeId {
        self.alloc(GrammarNode::Terminal(pattern))
    }

    /// Reserves a `RuleRef` node with no production yet; use
    /// [`GrammarArena::set_rule_spec`] once the rule's body is built, which
    /// is what lets the body refer back to this same `RuleRef`.
    pub fn reserve_rule(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(GrammarNode::RuleRef {
            name: name.into(),
            spec: None,
        })
    }

    pub fn set_rule_spec(&mut self, rule: NodeId, spec: NodeId) {
        match &mut self.nodes[rule.index()] {
            GrammarNode::RuleRef { spec: slot, .. } => *slot = Some(spec),
            other => panic!("set_rule_spec called on non-RuleRef node: {other:?}"),
        }
    }

    pub fn concat(&mut self, parts: Vec<NodeId>) -> NodeId {
        self.alloc(GrammarNode::Concat(parts))
    }

    pub fn alter(&mut self, options: Vec<NodeId>) -> NodeId {
        self.alloc(GrammarNode::Alter(options))
    }

    pub fn count(&mut self, inner: NodeId, count_type: CountType) -> NodeId {
        self.alloc(GrammarNode::Count { inner, count_type })
    }

    pub fn get(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id.index()]
    }

    pub fn rule_name(&self, id: NodeId) -> &str {
        match self.get(id) {
            GrammarNode::RuleRef { name, .. } => name,
            other => panic!("rule_name called on non-RuleRef node: {other:?}"),
        }
    }
}

/// A complete grammar: an arena of nodes plus the start rule. The implicit
/// trailing end-of-input check is enforced by the parser at the
/// `GrammarMatcher` level (it expects the lexer to be exhausted after the
/// start rule matches), not encoded into the IR itself, to keep rule bodies
/// free of an EOF terminal they didn't write.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Grammar {
    pub arena: GrammarArena,
    pub start_rule: NodeId,
}

impl Grammar {
    pub fn new(arena: GrammarArena, start_rule: NodeId) -> Self {
        Grammar { arena, start_rule }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    #[test]
    fn self_recursive_rule_is_representable() {
        let mut arena = GrammarArena::new();
        let rule = arena.reserve_rule("expr");
        let lit = arena.terminal(TokenPattern::Exact(Token::new(TokenKind::Number, "1")));
        let body = arena.concat(vec![lit, rule]);
        arena.set_rule_spec(rule, body);

        match arena.get(rule) {
            GrammarNode::RuleRef { spec: Some(spec), .. } => {
                assert_eq!(*spec, body);
            }
            other => panic!("unexpected node: {other:?}"),
        }
    }
}
