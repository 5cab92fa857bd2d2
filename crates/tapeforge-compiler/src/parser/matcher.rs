//! The backtracking matcher engine.
//!
//! Grounded directly on `examples/original_source/VirtualParser.py`: each
//! grammar node kind gets a matcher kind with the exact same `start()`/
//! `next_match()` contract and the exact same retry algorithm (including the
//! `RuleMatcher` quirk of re-entering its body on every call rather than
//! keeping its own retry state — see `DESIGN.md` for why that asymmetry is
//! kept rather than "fixed"). Matchers are arena-allocated and referenced by
//! index, per the design notes, so that cyclic `RuleRef` graphs never need
//! reference counting.

use std::collections::HashMap;

use tapeforge_core::{CountType, CstNode, Grammar, GrammarNode, NodeId, Token, TokenPattern};

use crate::error::Error;
use crate::lexer::Lexer;

const DEFAULT_MAX_RECURSION_DEPTH: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatcherId(u32);

impl MatcherId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
enum MatcherNode {
    Literal {
        pattern: TokenPattern,
        forget: bool,
        positions: Vec<usize>,
    },
    ConcatLink {
        this: MatcherId,
        next: Option<MatcherId>,
        level: u32,
        built: Vec<Vec<CstNode>>,
    },
    AlterLink {
        this: MatcherId,
        next: Option<MatcherId>,
        level: u32,
        selected: Vec<bool>,
    },
    Count {
        inner: MatcherId,
        count_type: CountType,
        level: u32,
        data: Vec<Vec<Vec<CstNode>>>,
    },
    Rule {
        name: String,
        inner: MatcherId,
        forget: bool,
    },
}

/// Substitution tables that let the same grammar be reused across surface
/// dialects, plus the explicit `ParserContext` the design notes call for in
/// place of the source's global mutable lexer/parser singletons.
#[derive(Debug, Default, Clone)]
pub struct SubstitutionTables {
    pub terminal_table: HashMap<TokenPattern, TokenPattern>,
    pub rule_token_table: HashMap<String, TokenPattern>,
    pub terminal_forget_set: std::collections::HashSet<TokenPattern>,
    pub rule_forget_set: std::collections::HashSet<String>,
}

/// Drives one parse of a `Grammar` against a `Lexer`. Rebuilt fresh per
/// `parse()` call (mirroring `Parser.create_matchers`), not reused across
/// parses, since matcher attempt-frame stacks are meaningful only within a
/// single parse.
pub struct ParserContext<'g> {
    grammar: &'g Grammar,
    tables: &'g SubstitutionTables,
    arena: Vec<MatcherNode>,
    memo: HashMap<NodeId, MatcherId>,
    depth: u32,
    max_depth: u32,
}

impl<'g> ParserContext<'g> {
    pub fn new(grammar: &'g Grammar, tables: &'g SubstitutionTables) -> Self {
        ParserContext {
            grammar,
            tables,
            arena: Vec::new(),
            memo: HashMap::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    fn alloc(&mut self, node: MatcherNode) -> MatcherId {
        let id = MatcherId(self.arena.len() as u32);
        self.arena.push(node);
        id
    }

    fn get_matcher_literal(&mut self, pattern: &TokenPattern) -> MatcherId {
        let pattern = self
            .tables
            .terminal_table
            .get(pattern)
            .cloned()
            .unwrap_or_else(|| pattern.clone());
        let forget = self.tables.terminal_forget_set.contains(&pattern);
        self.alloc(MatcherNode::Literal {
            pattern,
            forget,
            positions: Vec::new(),
        })
    }

    fn get_matcher_concat(&mut self, node: NodeId) -> MatcherId {
        if let Some(&id) = self.memo.get(&node) {
            return id;
        }
        let GrammarNode::Concat(items) = self.grammar.arena.get(node) else {
            unreachable!("get_matcher_concat called on non-Concat node")
        };
        let items = items.clone();
        let mut next: Option<MatcherId> = None;
        for item in items.into_iter().rev() {
            let this = self.get_matcher_count(item);
            next = Some(self.alloc(MatcherNode::ConcatLink {
                this,
                next,
                level: 0,
                built: Vec::new(),
            }));
        }
        let id = next.expect("Concat grammar node must have at least one element");
        self.memo.insert(node, id);
        id
    }

    fn get_matcher_alter(&mut self, node: NodeId) -> MatcherId {
        if let Some(&id) = self.memo.get(&node) {
            return id;
        }
        let GrammarNode::Alter(options) = self.grammar.arena.get(node) else {
            unreachable!("get_matcher_alter called on non-Alter node")
        };
        let options = options.clone();
        let mut next: Option<MatcherId> = None;
        for item in options.into_iter().rev() {
            let this = self.get_matcher_count(item);
            next = Some(self.alloc(MatcherNode::AlterLink {
                this,
                next,
                level: 0,
                selected: Vec::new(),
            }));
        }
        let id = next.expect("Alter grammar node must have at least one option");
        self.memo.insert(node, id);
        id
    }

    fn get_matcher_rule(&mut self, node: NodeId) -> MatcherId {
        if let Some(&id) = self.memo.get(&node) {
            return id;
        }
        let name = self.grammar.arena.rule_name(node).to_string();
        if let Some(pattern) = self.tables.rule_token_table.get(&name).cloned() {
            let id = self.get_matcher_literal(&pattern);
            self.memo.insert(node, id);
            return id;
        }
        let forget = self.tables.rule_forget_set.contains(&name);
        // Reserve the slot and memoize it *before* recursing into the rule's
        // body, so a self- or mutually-recursive RuleRef sees this same id
        // instead of recursing forever during construction.
        let id = self.alloc(MatcherNode::Rule {
            name: name.clone(),
            inner: MatcherId(0),
            forget,
        });
        self.memo.insert(node, id);

        let GrammarNode::RuleRef { spec, .. } = self.grammar.arena.get(node) else {
            unreachable!("get_matcher_rule called on non-RuleRef node")
        };
        let spec = spec.expect("RuleRef must have its spec attached before parsing");
        let inner = self.get_matcher_count(spec);
        self.arena[id.index()] = MatcherNode::Rule { name, inner, forget };
        id
    }

    fn get_matcher_count(&mut self, node: NodeId) -> MatcherId {
        if let Some(&id) = self.memo.get(&node) {
            return id;
        }
        let GrammarNode::Count { inner, count_type } = self.grammar.arena.get(node) else {
            unreachable!("get_matcher_count called on non-Count node")
        };
        let (inner, count_type) = (*inner, *count_type);
        let inner_matcher = match self.grammar.arena.get(inner) {
            GrammarNode::RuleRef { .. } => self.get_matcher_rule(inner),
            GrammarNode::Terminal(pattern) => {
                let pattern = pattern.clone();
                self.get_matcher_literal(&pattern)
            }
            GrammarNode::Alter(_) => self.get_matcher_alter(inner),
            GrammarNode::Concat(_) => self.get_matcher_concat(inner),
            GrammarNode::Count { .. } => {
                unreachable!("Count node may not directly wrap another Count node")
            }
        };
        let id = self.alloc(MatcherNode::Count {
            inner: inner_matcher,
            count_type,
            level: 0,
            data: Vec::new(),
        });
        self.memo.insert(node, id);
        id
    }

    /// Builds (memoized) matchers for the grammar's start rule and parses
    /// `lexer` against it, enforcing the implicit trailing end-of-input the
    /// spec's `Grammar` entity carries.
    pub fn parse(&mut self, lexer: &mut Lexer<'_>) -> Result<CstNode, Error> {
        let rule_matcher = self.get_matcher_rule(self.grammar.start_rule);
        self.start(rule_matcher, lexer);
        let result = self.next_match(rule_matcher, lexer)?;
        let Some(mut nodes) = result else {
            return Err(Error::syntax("Invalid syntax."));
        };
        if nodes.len() != 1 {
            return Err(Error::syntax("Invalid syntax."));
        }
        let save = lexer.position();
        let trailing = lexer.next_token();
        lexer.set_position(save);
        if !trailing.is_eof() {
            return Err(Error::syntax(format!(
                "unexpected trailing token after a complete parse: {trailing}"
            )));
        }
        Ok(nodes.remove(0))
    }

    fn start(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) {
        match &mut self.arena[id.index()] {
            MatcherNode::Literal { positions, .. } => positions.push(lexer.position()),
            MatcherNode::ConcatLink { this, level, .. } => {
                *level += 1;
                let this = *this;
                self.start(this, lexer);
            }
            MatcherNode::AlterLink { this, level, selected, .. } => {
                *level += 1;
                selected.push(true);
                let this = *this;
                self.start(this, lexer);
            }
            MatcherNode::Count { level, .. } => {
                *level += 1;
            }
            MatcherNode::Rule { .. } => {}
        }
    }

    fn next_match(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) -> Result<Option<Vec<CstNode>>, Error> {
        match id_kind(&self.arena[id.index()]) {
            Kind::Literal => Ok(self.next_match_literal(id, lexer)),
            Kind::ConcatLink => self.next_match_concat(id, lexer),
            Kind::AlterLink => self.next_match_alter(id, lexer),
            Kind::Count => self.next_match_count(id, lexer),
            Kind::Rule => self.next_match_rule(id, lexer),
        }
    }

    fn next_match_literal(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) -> Option<Vec<CstNode>> {
        let MatcherNode::Literal { pattern, forget, positions } = &mut self.arena[id.index()] else {
            unreachable!()
        };
        let start_pos = *positions.last().expect("start() must precede next_match()");
        lexer.set_position(start_pos);
        let token = lexer.next_token();
        if pattern.matches(&token) {
            return Some(if *forget { Vec::new() } else { vec![CstNode::Leaf(token)] });
        }
        lexer.set_position(start_pos);
        positions.pop();
        None
    }

    fn next_match_concat(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) -> Result<Option<Vec<CstNode>>, Error> {
        let (this, next, level, built_len) = {
            let MatcherNode::ConcatLink { this, next, level, built } = &self.arena[id.index()] else {
                unreachable!()
            };
            (*this, *next, *level, built.len() as u32)
        };

        if level != built_len {
            let Some(result) = self.next_match(this, lexer)? else {
                self.dec_concat_level(id);
                return Ok(None);
            };
            self.push_concat_built(id, result);
            if next.is_none() {
                return Ok(Some(self.last_concat_built(id)));
            }
            self.start(next.unwrap(), lexer);
        }

        loop {
            let next_result = match next {
                Some(next_id) => self.next_match(next_id, lexer)?,
                None => None,
            };
            match next_result {
                Some(rest) => {
                    let mut combined = self.last_concat_built(id);
                    combined.extend(rest);
                    return Ok(Some(combined));
                }
                None => {
                    let Some(result) = self.next_match(this, lexer)? else {
                        self.dec_concat_level_and_pop(id);
                        return Ok(None);
                    };
                    self.replace_last_concat_built(id, result);
                    if next.is_none() {
                        return Ok(Some(self.last_concat_built(id)));
                    }
                    self.start(next.unwrap(), lexer);
                }
            }
        }
    }

    fn push_concat_built(&mut self, id: MatcherId, value: Vec<CstNode>) {
        if let MatcherNode::ConcatLink { built, .. } = &mut self.arena[id.index()] {
            built.push(value);
        }
    }

    fn replace_last_concat_built(&mut self, id: MatcherId, value: Vec<CstNode>) {
        if let MatcherNode::ConcatLink { built, .. } = &mut self.arena[id.index()] {
            *built.last_mut().expect("built must be non-empty") = value;
        }
    }

    fn last_concat_built(&self, id: MatcherId) -> Vec<CstNode> {
        if let MatcherNode::ConcatLink { built, .. } = &self.arena[id.index()] {
            built.last().expect("built must be non-empty").clone()
        } else {
            unreachable!()
        }
    }

    fn dec_concat_level(&mut self, id: MatcherId) {
        if let MatcherNode::ConcatLink { level, .. } = &mut self.arena[id.index()] {
            *level -= 1;
        }
    }

    fn dec_concat_level_and_pop(&mut self, id: MatcherId) {
        if let MatcherNode::ConcatLink { level, built, .. } = &mut self.arena[id.index()] {
            *level -= 1;
            built.pop();
        }
    }

    fn next_match_alter(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) -> Result<Option<Vec<CstNode>>, Error> {
        let (this, next, selected_top) = {
            let MatcherNode::AlterLink { this, next, selected, .. } = &self.arena[id.index()] else {
                unreachable!()
            };
            (*this, *next, *selected.last().expect("start() must precede next_match()"))
        };

        if selected_top {
            if let Some(result) = self.next_match(this, lexer)? {
                return Ok(Some(result));
            }
            let Some(next_id) = next else {
                self.pop_alter(id);
                return Ok(None);
            };
            self.set_alter_selected_top(id, false);
            self.start(next_id, lexer);
        }

        let next_id = match &self.arena[id.index()] {
            MatcherNode::AlterLink { next, .. } => *next,
            _ => unreachable!(),
        };
        match next_id {
            Some(next_id) => {
                let result = self.next_match(next_id, lexer)?;
                if result.is_none() {
                    self.pop_alter(id);
                }
                Ok(result)
            }
            None => {
                self.pop_alter(id);
                Ok(None)
            }
        }
    }

    fn set_alter_selected_top(&mut self, id: MatcherId, value: bool) {
        if let MatcherNode::AlterLink { selected, .. } = &mut self.arena[id.index()] {
            *selected.last_mut().unwrap() = value;
        }
    }

    fn pop_alter(&mut self, id: MatcherId) {
        if let MatcherNode::AlterLink { level, selected, .. } = &mut self.arena[id.index()] {
            *level -= 1;
            selected.pop();
        }
    }

    fn next_match_count(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) -> Result<Option<Vec<CstNode>>, Error> {
        let (inner, count_type, level, data_len) = {
            let MatcherNode::Count { inner, count_type, level, data } = &self.arena[id.index()] else {
                unreachable!()
            };
            (*inner, *count_type, *level, data.len() as u32)
        };

        if data_len != level {
            self.start(inner, lexer);
            let first = self.next_match(inner, lexer)?;
            let mut build: Vec<Vec<CstNode>> = Vec::new();
            match first {
                None => {
                    if matches!(count_type, CountType::One | CountType::OneOrMany) {
                        self.dec_count_level(id);
                        return Ok(None);
                    }
                }
                Some(result) => {
                    if matches!(count_type, CountType::One | CountType::ZeroOrOne) {
                        build.push(result);
                    } else {
                        let mut result = Some(result);
                        while let Some(r) = result {
                            build.push(r);
                            self.start(inner, lexer);
                            result = self.next_match(inner, lexer)?;
                        }
                    }
                }
            }
            let flattened = build.iter().flatten().cloned().collect();
            self.push_count_data(id, build);
            return Ok(Some(flattened));
        }

        let mut build = self.take_count_build(id);
        if build.is_empty() {
            self.dec_count_level_and_pop(id);
            return Ok(None);
        }
        build.pop();
        let mut result = self.next_match(inner, lexer)?;
        if matches!(count_type, CountType::One | CountType::ZeroOrOne) {
            if let Some(r) = result.take() {
                build.push(r);
            }
        } else {
            while let Some(r) = result {
                build.push(r);
                self.start(inner, lexer);
                result = self.next_match(inner, lexer)?;
            }
        }
        if !build.is_empty() {
            let flattened = build.iter().flatten().cloned().collect();
            self.put_count_build(id, build);
            return Ok(Some(flattened));
        }
        if matches!(count_type, CountType::One | CountType::OneOrMany) {
            self.dec_count_level_and_pop(id);
            return Ok(None);
        }
        self.put_count_build(id, build);
        Ok(Some(Vec::new()))
    }

    fn push_count_data(&mut self, id: MatcherId, build: Vec<Vec<CstNode>>) {
        if let MatcherNode::Count { data, .. } = &mut self.arena[id.index()] {
            data.push(build);
        }
    }

    fn take_count_build(&mut self, id: MatcherId) -> Vec<Vec<CstNode>> {
        if let MatcherNode::Count { data, .. } = &mut self.arena[id.index()] {
            data.last().expect("count data must be non-empty").clone()
        } else {
            unreachable!()
        }
    }

    fn put_count_build(&mut self, id: MatcherId, build: Vec<Vec<CstNode>>) {
        if let MatcherNode::Count { data, .. } = &mut self.arena[id.index()] {
            *data.last_mut().expect("count data must be non-empty") = build;
        }
    }

    fn dec_count_level(&mut self, id: MatcherId) {
        if let MatcherNode::Count { level, .. } = &mut self.arena[id.index()] {
            *level -= 1;
        }
    }

    fn dec_count_level_and_pop(&mut self, id: MatcherId) {
        if let MatcherNode::Count { level, data, .. } = &mut self.arena[id.index()] {
            *level -= 1;
            data.pop();
        }
    }

    fn next_match_rule(&mut self, id: MatcherId, lexer: &mut Lexer<'_>) -> Result<Option<Vec<CstNode>>, Error> {
        let (name, inner, forget) = {
            let MatcherNode::Rule { name, inner, forget } = &self.arena[id.index()] else {
                unreachable!()
            };
            (name.clone(), *inner, *forget)
        };

        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(Error::LeftRecursion { rule: name });
        }
        self.start(inner, lexer);
        let result = self.next_match(inner, lexer);
        self.depth -= 1;
        let result = result?;

        Ok(match result {
            None => None,
            Some(children) => Some(if forget {
                Vec::new()
            } else {
                vec![CstNode::nonterminal(name, children)]
            }),
        })
    }
}

enum Kind {
    Literal,
    ConcatLink,
    AlterLink,
    Count,
    Rule,
}

fn id_kind(node: &MatcherNode) -> Kind {
    match node {
        MatcherNode::Literal { .. } => Kind::Literal,
        MatcherNode::ConcatLink { .. } => Kind::ConcatLink,
        MatcherNode::AlterLink { .. } => Kind::AlterLink,
        MatcherNode::Count { .. } => Kind::Count,
        MatcherNode::Rule { .. } => Kind::Rule,
    }
}

/// Convenience entry point: parse `source` against `grammar` with no
/// substitution tables.
pub fn parse_with(grammar: &Grammar, tables: &SubstitutionTables, lexer: &mut Lexer<'_>) -> Result<CstNode, Error> {
    let mut ctx = ParserContext::new(grammar, tables);
    ctx.parse(lexer)
}
