//! Two-pass AST walker translating a cleaned CST into a complete macro
//! table plus a rendered entry-point invocation.
//!
//! Grounded on `examples/original_source/VarfuckTranspiler.py`'s
//! `Processor`: pass one catalogs every `macro_def`'s signature (name,
//! compile-time params, run-time params, return sizes) so forward
//! references resolve regardless of declaration order; pass two re-walks
//! every `macro_def` and translates its body against the now-complete
//! catalog.

use std::collections::{HashMap, HashSet};

use tapeforge_core::CstNode;

use crate::constexpr::ConstExpr;
use crate::diagnostics::{Diagnostics, Severity};
use crate::error::{Error, Result};
use crate::macro_model::{MacroId, MacroInvocation, MacroTable};
use crate::stack_manager::{BinX, StackManager};

pub struct Processor {
    pub macros: MacroTable,
    pub diagnostics: Diagnostics,
    constants: HashMap<String, ConstExpr>,
    invoked: HashSet<MacroId>,
}

impl Default for Processor {
    fn default() -> Self {
        Processor::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        let mut macros = MacroTable::new();
        for m in crate::builtins::catalog() {
            macros.insert(m);
        }
        Processor {
            macros,
            diagnostics: Diagnostics::new(),
            constants: HashMap::new(),
            invoked: HashSet::new(),
        }
    }

    /// Runs both passes over `program` (a cleaned `grammar` root) and
    /// returns the entry-point invocation, ready for `render` with no outer
    /// bindings. Populates `self.diagnostics` with advisory warnings (e.g.
    /// declared-but-never-called macros) collected along the way.
    pub fn process(&mut self, program: &CstNode) -> Result<MacroInvocation> {
        if !program.is_rule("grammar") {
            return Err(Error::syntax("expected a `grammar` root node"));
        }
        let children = program.children();
        let Some((call, items)) = children.split_last() else {
            return Err(Error::syntax("a program must end with an entry-point call"));
        };

        for item in items {
            let inner = unwrap_single(item, "item");
            if inner.is_rule("const_def") {
                self.process_global_const(inner)?;
            }
        }

        let mut macro_defs = Vec::new();
        for item in items {
            let inner = unwrap_single(item, "item");
            if inner.is_rule("macro_def") {
                let id = self.reserve_macro(inner)?;
                macro_defs.push((id, inner.clone()));
            }
        }

        for (id, def) in &macro_defs {
            self.build_macro_body(*id, def)?;
        }

        let entry = self.translate_call(call, &mut None, &HashMap::new(), &[])?;

        for (id, _) in &macro_defs {
            if !self.invoked.contains(id) {
                let name = self.macros.get(*id).name.clone();
                self.diagnostics.push(Severity::Warning, None, format!("macro `{name}` is never called"));
            }
        }

        Ok(entry)
    }

    fn process_global_const(&mut self, const_def: &CstNode) -> Result<()> {
        let children = const_def.children();
        let name = leaf_text(&children[0])?;
        if self.constants.contains_key(&name) {
            return Err(Error::DuplicateConstant(name));
        }
        let value = ConstExpr::build_from_ast(&children[1])?;
        let value = self.resolve(&HashMap::new(), value);
        self.constants.insert(name, value);
        Ok(())
    }

    /// Substitutes every known global constant (and, when given, the
    /// current body's locals, which take priority) into `expr`, leaving
    /// compile-time parameters and genuinely free references symbolic.
    fn resolve(&self, locals: &HashMap<String, ConstExpr>, expr: ConstExpr) -> ConstExpr {
        let mut merged = self.constants.clone();
        merged.extend(locals.clone());
        let mut expr = expr;
        for (name, value) in &merged {
            expr = expr.replace(name, value);
        }
        expr
    }

    fn reserve_macro(&mut self, def: &CstNode) -> Result<MacroId> {
        let children = def.children();
        // [ident, const_param_struct, param_struct, const_struct(returns), block]
        let name = leaf_text(&children[0])?;
        if self.macros.lookup(&name).is_some() {
            return Err(Error::syntax(format!("macro `{name}` is already declared")));
        }
        let compile_time_params = names_of(&children[1])?;
        let run_time_params = self.param_struct_to_binx(&children[2])?;
        let return_sizes = self.const_struct_to_exprs(&children[3])?;
        Ok(self.macros.reserve(name, compile_time_params, run_time_params, return_sizes))
    }

    fn param_struct_to_binx(&self, param_struct: &CstNode) -> Result<Vec<BinX>> {
        let children = param_struct.children();
        let mut out = Vec::new();
        let mut i = 0;
        while i < children.len() {
            let name = leaf_text(&children[i])?;
            let size = ConstExpr::build_from_ast(&children[i + 1])?;
            out.push(BinX::new(Some(name), self.resolve(&HashMap::new(), size)));
            i += 2;
        }
        Ok(out)
    }

    fn const_struct_to_exprs(&self, const_struct: &CstNode) -> Result<Vec<ConstExpr>> {
        const_struct
            .children()
            .iter()
            .map(|c| ConstExpr::build_from_ast(c).map(|e| self.resolve(&HashMap::new(), e)))
            .collect()
    }

    fn build_macro_body(&mut self, id: MacroId, def: &CstNode) -> Result<()> {
        let children = def.children();
        let block = &children[4];
        let (compile_time_params, run_time_params, return_sizes) = {
            let m = self.macros.get(id);
            (m.compile_time_params.clone(), m.run_time_params.clone(), m.return_sizes.clone())
        };

        let mut stack = StackManager::new(run_time_params.clone(), return_sizes);
        let mut locals: HashMap<String, ConstExpr> = HashMap::new();
        self.translate_block(block, &mut stack, &mut locals, &compile_time_params)?;
        stack.end(!run_time_params.is_empty())?;
        self.macros.finalize(id, stack.code, stack.comparisons);
        Ok(())
    }

    fn translate_block(
        &mut self,
        block: &CstNode,
        stack: &mut StackManager,
        locals: &mut HashMap<String, ConstExpr>,
        ctparams: &[String],
    ) -> Result<()> {
        for stmt in block.children() {
            let inner = unwrap_single(stmt, "stmt");
            self.translate_stmt(inner, stack, locals, ctparams)?;
        }
        Ok(())
    }

    fn translate_stmt(
        &mut self,
        stmt: &CstNode,
        stack: &mut StackManager,
        locals: &mut HashMap<String, ConstExpr>,
        ctparams: &[String],
    ) -> Result<()> {
        match stmt.rule_name() {
            Some("const_def") => {
                let children = stmt.children();
                let name = leaf_text(&children[0])?;
                if locals.contains_key(&name) {
                    return Err(Error::DuplicateConstant(name));
                }
                let value = ConstExpr::build_from_ast(&children[1])?;
                let value = self.resolve(locals, value);
                locals.insert(name, value);
                Ok(())
            }
            Some("call") => {
                self.translate_call(stmt, &mut Some(stack), locals, ctparams)?;
                Ok(())
            }
            Some("return") => {
                let names = names_of(&stmt.children()[0])?;
                stack.fuck(&names)
            }
            Some("ifel") => self.translate_ifel(stmt, stack, locals, ctparams),
            Some("while_or_repeat") => self.translate_while(stmt, stack, locals, ctparams),
            other => Err(Error::syntax(format!("unexpected statement node `{other:?}`"))),
        }
    }

    /// Shared by the root entry-point call (`stack` absent) and every
    /// in-body `call` statement (`stack` present).
    fn translate_call(
        &mut self,
        call_node: &CstNode,
        stack: &mut Option<&mut StackManager>,
        locals: &HashMap<String, ConstExpr>,
        ctparams: &[String],
    ) -> Result<MacroInvocation> {
        let children = call_node.children();
        let name = leaf_text(&children[0])?;
        let const_args: Vec<ConstExpr> = children[1]
            .children()
            .iter()
            .map(|c| ConstExpr::build_from_ast(c).map(|e| self.resolve(locals, e)))
            .collect::<Result<_>>()?;
        let arg_names = names_of(&children[2])?;
        let ret_names: Vec<String> = if children.len() > 3 { names_of(&children[3])? } else { Vec::new() };

        let _ = ctparams;
        let target = self.macros.lookup(&name).ok_or_else(|| Error::UndefinedMacro(name.clone()))?;
        self.invoked.insert(target);
        let target_macro = self.macros.get(target);
        if target_macro.compile_time_params.len() != const_args.len() {
            return Err(Error::ArityMismatch {
                name: name.clone(),
                expected: target_macro.compile_time_params.len(),
                found: const_args.len(),
            });
        }
        let bindings: HashMap<String, ConstExpr> =
            target_macro.compile_time_params.iter().cloned().zip(const_args.iter().cloned()).collect();
        let arg_sizes: Vec<ConstExpr> =
            target_macro.run_time_params.iter().map(|p| bind(&p.size, &bindings)).collect();
        let ret_sizes: Vec<ConstExpr> = target_macro.return_sizes.iter().map(|s| bind(s, &bindings)).collect();

        let arg_names_opt: Vec<Option<String>> = arg_names.into_iter().map(Some).collect();
        let ret_names_opt: Vec<Option<String>> = ret_names.into_iter().map(Some).collect();
        let invocation = MacroInvocation::new(target, name, const_args);

        match stack {
            Some(stack) => stack.do_call(invocation, &arg_names_opt, &arg_sizes, &ret_names_opt, &ret_sizes),
            None => Ok(invocation),
        }
    }

    fn translate_ifel(
        &mut self,
        ifel: &CstNode,
        stack: &mut StackManager,
        locals: &mut HashMap<String, ConstExpr>,
        ctparams: &[String],
    ) -> Result<()> {
        let children = ifel.children();
        let cond = ConstExpr::build_from_ast(&children[0])?;
        let cond = self.resolve(locals, cond);
        let then_block = &children[1];
        let else_block = &children[2];

        if let Some(live) = single_live_reference(&cond, locals, ctparams) {
            stack.start_if(&live)?;
            self.translate_block(then_block, stack, locals, ctparams)?;
            stack.continue_if()?;
            self.translate_block(else_block, stack, locals, ctparams)?;
            stack.end_if()
        } else {
            // Compile-time-evaluable condition: both branches are still
            // emitted, unconditionally, guarded by `1 if cond else 0` and
            // its complement.
            let truthy = cond.render_i128()? != 0;
            let then_guard = if truthy { ConstExpr::literal(1) } else { ConstExpr::literal(0) };
            let else_guard = if truthy { ConstExpr::literal(0) } else { ConstExpr::literal(1) };
            stack.start_repeat(then_guard);
            self.translate_block(then_block, stack, locals, ctparams)?;
            stack.end_repeat();
            stack.start_repeat(else_guard);
            self.translate_block(else_block, stack, locals, ctparams)?;
            stack.end_repeat();
            Ok(())
        }
    }

    fn translate_while(
        &mut self,
        while_node: &CstNode,
        stack: &mut StackManager,
        locals: &mut HashMap<String, ConstExpr>,
        ctparams: &[String],
    ) -> Result<()> {
        let children = while_node.children();
        let cond = ConstExpr::build_from_ast(&children[0])?;
        let cond = self.resolve(locals, cond);
        let body = &children[1];

        if let Some(live) = single_live_reference(&cond, locals, ctparams) {
            stack.start_while(&live)?;
            self.translate_block(body, stack, locals, ctparams)?;
            stack.end_while()
        } else {
            let n = cond.render_i128()?;
            stack.start_repeat(ConstExpr::literal(n));
            self.translate_block(body, stack, locals, ctparams)?;
            stack.end_repeat();
            Ok(())
        }
    }
}

fn bind(expr: &ConstExpr, bindings: &HashMap<String, ConstExpr>) -> ConstExpr {
    let mut expr = expr.clone();
    for (name, value) in bindings {
        expr = expr.replace(name, value);
    }
    expr
}

/// A condition counts as "a single reference to a live variable" only if it
/// is exactly one bare identifier that is neither a known local/global
/// constant nor a compile-time parameter — i.e. it names a run-time tape
/// variable.
fn single_live_reference(cond: &ConstExpr, locals: &HashMap<String, ConstExpr>, ctparams: &[String]) -> Option<String> {
    let name = cond.as_bare_reference()?;
    if locals.contains_key(&name) || ctparams.iter().any(|p| p == &name) {
        return None;
    }
    Some(name)
}

fn unwrap_single<'a>(node: &'a CstNode, rule: &str) -> &'a CstNode {
    if node.is_rule(rule) {
        &node.children()[0]
    } else {
        node
    }
}

fn leaf_text(node: &CstNode) -> Result<String> {
    node.as_leaf()
        .map(|t| t.text.clone())
        .ok_or_else(|| Error::syntax("expected an identifier"))
}

fn names_of(list_struct: &CstNode) -> Result<Vec<String>> {
    list_struct.children().iter().map(leaf_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammars::{default_tables, surface_grammar};
    use crate::parser::parse;

    fn process(source: &str) -> Result<Processor> {
        let grammar = surface_grammar();
        let tables = default_tables();
        let tree = parse(&grammar, &tables, source)?;
        let mut processor = Processor::new();
        processor.process(&tree)?;
        Ok(processor)
    }

    #[test]
    fn minimal_program_resolves_the_entry_point() {
        let grammar = surface_grammar();
        let tables = default_tables();
        let tree = parse(&grammar, &tables, "macro main[]() -> () {} call main() ()").unwrap();
        let mut processor = Processor::new();
        let invocation = processor.process(&tree).unwrap();
        assert_eq!(invocation.target_name, "main");
    }

    #[test]
    fn undeclared_entry_point_is_an_undefined_macro_error() {
        let err = process("call nope() ()").unwrap_err();
        assert!(matches!(err, Error::UndefinedMacro(name) if name == "nope"));
    }

    #[test]
    fn global_constants_are_visible_to_macro_signatures() {
        let processor = process(
            "num width = 8; macro id[n](a: width) -> (width) { fuck(a); } \
             macro main[]() -> () {} call main() ()",
        )
        .unwrap();
        let id = processor.macros.lookup("id").unwrap();
        let m = processor.macros.get(id);
        assert_eq!(m.run_time_params[0].size.render_string().unwrap(), "8");
    }

    #[test]
    fn forward_referenced_macro_is_callable() {
        let processor = process(
            "macro first[](a: 1) -> (1) { call second() (a) -> (a); fuck(a); } \
             macro second[](x: 1) -> (1) { fuck(x); } \
             macro main[]() -> () {} \
             call main() ()",
        )
        .unwrap();
        assert!(processor.macros.lookup("first").is_some());
        assert!(processor.macros.lookup("second").is_some());
    }

    #[test]
    fn duplicate_global_constant_is_an_error() {
        let err = process("num x = 1; num x = 2; call main() ()").unwrap_err();
        assert!(matches!(err, Error::DuplicateConstant(name) if name == "x"));
    }
}
