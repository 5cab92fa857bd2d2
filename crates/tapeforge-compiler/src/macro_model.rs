//! Macro declarations and their deferred invocations.
//!
//! Grounded on `examples/original_source/VarfuckTranspiler.py`'s `Macro` and
//! `MacroInvocation`: a macro is compiled once into a flat list of code
//! fragments (raw target-ISA text, symbolic sizes, or nested invocations),
//! and every call site defers rendering until all of its compile-time
//! arguments are known, at which point `render` walks the fragment list and
//! splices in the bound values.
//!
//! Macros reference each other by `MacroId` into a `MacroTable`, not by
//! `Rc`, so that a call to a macro defined later in the source (a forward
//! reference, legal per the Processor's two-pass resolution) can be wired up
//! before that macro's body exists — `MacroTable::reserve` hands back an id
//! whose slot is filled in afterward by `MacroTable::finalize`.

use std::collections::HashMap;

use crate::constexpr::ConstExpr;
use crate::error::{Error, Result};
use crate::stack_manager::{BinX, CodeFragment};

/// Index into a `MacroTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacroId(u32);

impl MacroId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A compiled macro: either a user-defined one (body built via
/// `StackManager`, then frozen into `code`) or a built-in whose `code` is a
/// single opaque macro-language call template (see `builtins.rs`).
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub compile_time_params: Vec<String>,
    pub run_time_params: Vec<BinX>,
    pub return_sizes: Vec<ConstExpr>,
    pub code: Vec<CodeFragment>,
    /// Size-agreement pairs recorded by the `StackManager` that built this
    /// macro's body (argument-to-parameter, return-to-destination,
    /// `fuck`-slot-to-declared-return); checked structurally equal, under
    /// the call's bindings, every time this macro is rendered.
    pub comparisons: Vec<(ConstExpr, ConstExpr)>,
}

impl Macro {
    pub fn new(
        name: String,
        compile_time_params: Vec<String>,
        run_time_params: Vec<BinX>,
        return_sizes: Vec<ConstExpr>,
        code: Vec<CodeFragment>,
        comparisons: Vec<(ConstExpr, ConstExpr)>,
    ) -> Self {
        Macro {
            name,
            compile_time_params,
            run_time_params,
            return_sizes,
            code,
            comparisons,
        }
    }

    /// Built-ins carry no StackManager-built body: `code` is a single raw
    /// macro-language call template, rendered by splicing compile-time
    /// arguments in as decimal literals (see `render`).
    pub fn new_builtin(
        name: String,
        compile_time_params: Vec<String>,
        run_time_params: Vec<BinX>,
        return_sizes: Vec<ConstExpr>,
    ) -> Self {
        let template = format!(
            "{}({})",
            name,
            compile_time_params.iter().map(|p| format!("{{{p}}}")).collect::<Vec<_>>().join(";")
        );
        Macro {
            name,
            compile_time_params,
            run_time_params,
            return_sizes,
            code: vec![CodeFragment::Raw(template)],
            comparisons: Vec::new(),
        }
    }

    /// A placeholder registered during the Processor's first pass, signature
    /// only, body filled in once the second pass compiles it.
    fn skeleton(
        name: String,
        compile_time_params: Vec<String>,
        run_time_params: Vec<BinX>,
        return_sizes: Vec<ConstExpr>,
    ) -> Self {
        Macro {
            name,
            compile_time_params,
            run_time_params,
            return_sizes,
            code: Vec::new(),
            comparisons: Vec::new(),
        }
    }
}

/// Owns every `Macro` reachable during one compilation: the built-in catalog
/// plus every user `macro_def`, keyed by `MacroId` so forward references
/// resolve regardless of source order.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: Vec<Macro>,
    by_name: HashMap<String, MacroId>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable::default()
    }

    pub fn get(&self, id: MacroId) -> &Macro {
        &self.macros[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<MacroId> {
        self.by_name.get(name).copied()
    }

    /// Inserts a fully-built macro (a built-in, typically) and returns its id.
    pub fn insert(&mut self, macro_: Macro) -> MacroId {
        let id = MacroId(self.macros.len() as u32);
        self.by_name.insert(macro_.name.clone(), id);
        self.macros.push(macro_);
        id
    }

    /// Registers a signature-only skeleton (pass one of the Processor),
    /// returning the id nested invocations elsewhere can already target.
    pub fn reserve(
        &mut self,
        name: String,
        compile_time_params: Vec<String>,
        run_time_params: Vec<BinX>,
        return_sizes: Vec<ConstExpr>,
    ) -> MacroId {
        self.insert(Macro::skeleton(name, compile_time_params, run_time_params, return_sizes))
    }

    /// Fills in a skeleton's body once pass two has compiled it.
    pub fn finalize(&mut self, id: MacroId, code: Vec<CodeFragment>, comparisons: Vec<(ConstExpr, ConstExpr)>) {
        let macro_ = &mut self.macros[id.index()];
        macro_.code = code;
        macro_.comparisons = comparisons;
    }
}

/// A single call site of a `Macro`, deferred until the enclosing macro's
/// own compile-time bindings are known.
#[derive(Debug, Clone)]
pub struct MacroInvocation {
    pub target: MacroId,
    pub target_name: String,
    pub args: Vec<ConstExpr>,
    v_params: Vec<ConstExpr>,
    ret: Vec<ConstExpr>,
}

impl MacroInvocation {
    pub fn new(target: MacroId, target_name: String, args: Vec<ConstExpr>) -> Self {
        MacroInvocation {
            target,
            target_name,
            args,
            v_params: Vec::new(),
            ret: Vec::new(),
        }
    }

    pub fn set_v_params(&mut self, v_params: Vec<ConstExpr>) {
        self.v_params = v_params;
    }

    pub fn set_ret(&mut self, ret: Vec<ConstExpr>) {
        self.ret = ret;
    }

    fn bind_compile_time(&self, bindings: &HashMap<String, ConstExpr>) -> Vec<ConstExpr> {
        self.args
            .iter()
            .map(|a| {
                let mut a = a.clone();
                for (name, value) in bindings {
                    a = a.replace(name, value);
                }
                a
            })
            .collect()
    }

    /// Checks that the invocation's recorded argument/return sizes agree
    /// with the target macro's declaration under `bindings`.
    pub fn prepare(&self, bindings: &HashMap<String, ConstExpr>, table: &MacroTable) -> Result<()> {
        let target = table.get(self.target);
        let bound_args = self.bind_compile_time(bindings);
        let mut own_bindings: HashMap<String, ConstExpr> =
            target.compile_time_params.iter().cloned().zip(bound_args.iter().cloned()).collect();
        own_bindings.extend(bindings.clone());

        for (expected, v_param) in target.run_time_params.iter().zip(self.v_params.iter()) {
            let expected_size = substitute(&expected.size, &own_bindings);
            let bound = substitute(v_param, bindings);
            if expected_size.render_string()? != bound.render_string()? {
                return Err(Error::SizeMismatch {
                    what: format!("argument to macro `{}`", target.name),
                    expected: expected_size.render_string().unwrap_or_default(),
                    found: bound.render_string().unwrap_or_default(),
                });
            }
        }
        for (expected, ret) in target.return_sizes.iter().zip(self.ret.iter()) {
            let expected_size = substitute(expected, &own_bindings);
            let bound = substitute(ret, bindings);
            if expected_size.render_string()? != bound.render_string()? {
                return Err(Error::SizeMismatch {
                    what: format!("return value of macro `{}`", target.name),
                    expected: expected_size.render_string().unwrap_or_default(),
                    found: bound.render_string().unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Renders this invocation's target-ISA text: substitutes `bindings`
    /// into the compile-time arguments, then walks the target macro's frozen
    /// `code` list, substituting the macro's own parameters (bound to the
    /// rendered arguments) into every fragment and recursively rendering
    /// nested invocations.
    pub fn render(&self, bindings: &HashMap<String, ConstExpr>, table: &MacroTable) -> Result<String> {
        self.prepare(bindings, table)?;
        let target = table.get(self.target);
        let bound_args = self.bind_compile_time(bindings);
        let own_bindings: HashMap<String, ConstExpr> =
            target.compile_time_params.iter().cloned().zip(bound_args.iter().cloned()).collect();

        for (lhs, rhs) in &target.comparisons {
            let lhs = substitute(lhs, &own_bindings);
            let rhs = substitute(rhs, &own_bindings);
            if lhs.render_string()? != rhs.render_string()? {
                return Err(Error::SizeMismatch {
                    what: format!("size comparison inside macro `{}`", target.name),
                    expected: lhs.render_string().unwrap_or_default(),
                    found: rhs.render_string().unwrap_or_default(),
                });
            }
        }

        let mut out = String::new();
        for fragment in &target.code {
            match fragment {
                CodeFragment::Raw(text) => out.push_str(&render_template(text, &own_bindings)?),
                CodeFragment::Expr(expr) => {
                    let bound = substitute(expr, &own_bindings);
                    out.push_str(&bound.render_string()?);
                }
                CodeFragment::Invocation(nested) => out.push_str(&nested.render(&own_bindings, table)?),
            }
        }
        Ok(out)
    }
}

fn substitute(expr: &ConstExpr, bindings: &HashMap<String, ConstExpr>) -> ConstExpr {
    let mut expr = expr.clone();
    for (name, value) in bindings {
        expr = expr.replace(name, value);
    }
    expr
}

/// Substitutes `{name}` placeholders in a built-in's call template with the
/// rendered decimal value bound to that compile-time parameter.
fn render_template(template: &str, bindings: &HashMap<String, ConstExpr>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        for c in chars.by_ref() {
            if c == '}' {
                break;
            }
            name.push(c);
        }
        let value = bindings
            .get(&name)
            .ok_or_else(|| Error::UndefinedVariable(name.clone()))?;
        out.push_str(&value.render_string()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_template_renders_bound_arguments() {
        let mut table = MacroTable::new();
        let id = table.insert(Macro::new_builtin("addbinx".to_string(), vec!["n".to_string()], Vec::new(), Vec::new()));
        let inv = MacroInvocation::new(id, "addbinx".to_string(), vec![ConstExpr::literal(4)]);
        let rendered = inv.render(&HashMap::new(), &table).unwrap();
        assert_eq!(rendered, "addbinx(4)");
    }

    #[test]
    fn nested_invocation_renders_recursively() {
        let mut table = MacroTable::new();
        let inner_id = table.insert(Macro::new_builtin("space".to_string(), Vec::new(), Vec::new(), Vec::new()));
        let inner_inv = MacroInvocation::new(inner_id, "space".to_string(), Vec::new());
        let outer_id = table.insert(Macro::new(
            "wrapper".to_string(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            vec![CodeFragment::Invocation(inner_inv)],
            Vec::new(),
        ));
        let outer_inv = MacroInvocation::new(outer_id, "wrapper".to_string(), Vec::new());
        assert_eq!(outer_inv.render(&HashMap::new(), &table).unwrap(), "space()");
    }

    #[test]
    fn forward_reference_resolves_after_finalize() {
        let mut table = MacroTable::new();
        let callee_id = table.reserve("later".to_string(), Vec::new(), Vec::new(), Vec::new());
        let call = MacroInvocation::new(callee_id, "later".to_string(), Vec::new());
        table.finalize(callee_id, vec![CodeFragment::Raw("later()".to_string())], Vec::new());
        assert_eq!(call.render(&HashMap::new(), &table).unwrap(), "later()");
    }
}
