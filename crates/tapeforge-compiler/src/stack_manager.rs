//! Symbolic one-dimensional tape layout tracker.
//!
//! Grounded on `examples/original_source/VarfuckTranspiler.py`'s `BinX` and
//! `BinXManager`: a stack of named variable blocks, each with a symbolic
//! (`ConstExpr`) size, allocated low-to-high, with a cursor that tracks where
//! the tape head currently sits so that every movement can be emitted as a
//! single symbolic distance rather than re-deriving it from scratch.

use indexmap::IndexMap;

use crate::constexpr::ConstExpr;
use crate::error::{Error, Result};
use crate::macro_model::MacroInvocation;

/// A named variable occupying a block of the tape, per `BinX` in the source.
#[derive(Debug, Clone)]
pub struct BinX {
    pub name: Option<String>,
    pub size: ConstExpr,
}

impl BinX {
    pub fn new(name: Option<String>, size: ConstExpr) -> Self {
        BinX {
            name,
            size: size.with_nnint(true),
        }
    }
}

/// One piece of a macro's emitted body.
#[derive(Debug, Clone)]
pub enum CodeFragment {
    Raw(String),
    Expr(ConstExpr),
    Invocation(MacroInvocation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    At(usize),
    Top,
}

struct VarMeta {
    size: ConstExpr,
    order: usize,
    position: ConstExpr,
}

/// Builds (and later replays, as a frozen template) one macro's body.
pub struct StackManager {
    pub total_size: ConstExpr,
    cursor: Option<String>,
    scope_stack: Vec<Vec<String>>,
    call_stack: Vec<ConstExpr>,
    vars: IndexMap<String, VarMeta>,
    next_order: usize,
    pub code: Vec<CodeFragment>,
    pub comparisons: Vec<(ConstExpr, ConstExpr)>,
    pub ret_pos: ConstExpr,
    pub ret_size: ConstExpr,
}

impl StackManager {
    /// `params` become the bottom scope's declared run-time parameters;
    /// `returns` become synthetic return-slot variables named `"0"`, `"1"`, …
    pub fn new(params: Vec<BinX>, returns: Vec<ConstExpr>) -> Self {
        let mut mgr = StackManager {
            total_size: ConstExpr::literal(0).with_nnint(true),
            cursor: None,
            scope_stack: Vec::new(),
            call_stack: Vec::new(),
            vars: IndexMap::new(),
            next_order: 0,
            code: Vec::new(),
            comparisons: Vec::new(),
            ret_pos: ConstExpr::literal(0),
            ret_size: ConstExpr::literal(0).with_nnint(true),
        };
        mgr.add_section();
        for p in &params {
            let size = p.size.clone();
            mgr.add_var(p.clone(), true);
            mgr.total_size = mgr.total_size.add(&size);
        }
        mgr.ret_pos = mgr.total_size.clone();
        for (i, ret) in returns.iter().enumerate() {
            mgr.add_var(BinX::new(Some(i.to_string()), ret.clone()), false);
            mgr.total_size = mgr.total_size.add(ret);
            mgr.ret_size = mgr.ret_size.add(ret);
        }
        mgr.cursor = mgr.scope_stack.last().and_then(|s| s.first().cloned());
        mgr
    }

    fn emit(&mut self, fragment: impl Into<CodeFragment>) {
        self.code.push(fragment.into());
    }

    fn position_of(&self, name: Option<&str>) -> ConstExpr {
        match name {
            None => self.total_size.clone(),
            Some(n) => self.vars[n].position.clone(),
        }
    }

    fn order_of(&self, name: Option<&str>) -> usize {
        match name {
            None => usize::MAX,
            Some(n) => self.vars[n].order,
        }
    }

    /// Moves the cursor to `pos` (`None` means "just past the top"),
    /// emitting the symbolic distance and a direction fragment.
    pub fn goto(&mut self, pos: Option<&str>) -> Result<()> {
        if let Some(n) = pos {
            if !self.vars.contains_key(n) {
                return Err(Error::UndefinedVariable(n.to_string()));
            }
        }
        if self.cursor.as_deref() == pos {
            return Ok(());
        }
        let a = self.position_of(self.cursor.as_deref());
        let b = self.position_of(pos);
        let go_right = self.cursor.is_none() || (pos.is_some() && self.order_of(pos) < self.order_of(self.cursor.as_deref()));
        if go_right {
            self.emit(CodeFragment::Expr(a.sub(&b)));
            self.emit(CodeFragment::Raw("<".to_string()));
        } else {
            self.emit(CodeFragment::Expr(b.sub(&a)));
            self.emit(CodeFragment::Raw(">".to_string()));
        }
        self.cursor = pos.map(str::to_string);
        Ok(())
    }

    pub fn add_section(&mut self) {
        self.call_stack.push(self.total_size.clone());
        self.scope_stack.push(Vec::new());
    }

    pub fn pop_section(&mut self) -> Result<()> {
        self.goto(None)?;
        let scope_start = self.call_stack.pop().expect("pop_section without matching add_section");
        let dif = self.total_size.sub(&scope_start);
        self.emit(CodeFragment::Expr(dif));
        self.emit(CodeFragment::Raw("repeat(<[-])".to_string()));
        self.total_size = scope_start;
        let names = self.scope_stack.pop().expect("pop_section without matching add_section");
        for name in names {
            self.del_var(&name);
        }
        Ok(())
    }

    pub fn add_var(&mut self, var: BinX, include: bool) {
        let name = var.name.expect("variable names must be complete");
        let order = self.next_order;
        self.next_order += 1;
        let position = self.total_size.clone();
        self.vars.insert(
            name.clone(),
            VarMeta {
                size: var.size,
                order,
                position,
            },
        );
        if include {
            self.scope_stack.last_mut().expect("add_var before add_section").push(name);
        }
    }

    pub fn del_var(&mut self, name: &str) {
        self.vars.shift_remove(name);
    }

    pub fn size_of(&self, name: &str) -> Result<ConstExpr> {
        self.vars
            .get(name)
            .map(|m| m.size.clone())
            .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
    }

    /// Zeros exactly `size(name)` cells at that variable's position.
    pub fn clear_var(&mut self, name: &str) -> Result<()> {
        self.goto(Some(name))?;
        let size = self.size_of(name)?;
        self.emit(CodeFragment::Expr(size.clone()));
        self.emit(CodeFragment::Raw("repeat([-]>)".to_string()));
        // `repeat([-]>)` physically walks the pointer `size` cells to the
        // right; retreat by raw fragments (not a second `goto`, which would
        // no-op since `self.cursor` still reads `Some(name)`) before
        // updating the cursor to match.
        self.emit(CodeFragment::Expr(size));
        self.emit(CodeFragment::Raw("<".to_string()));
        self.cursor = Some(name.to_string());
        Ok(())
    }

    /// Zeros a synthetic span of `size` cells at the current cursor, used
    /// when a return slot has no destination variable at all.
    pub fn clear_size(&mut self, size: ConstExpr) {
        self.emit(CodeFragment::Expr(size));
        self.emit(CodeFragment::Raw("repeat([-]>)".to_string()));
    }

    /// Duplicates `name`'s contents into the next `size(name)` cells past
    /// `total_size`, leaving the original untouched. Emits a `copybinx`
    /// call — the internal two-argument counterpart of the surface
    /// `copy` builtin, distinguished by arity so the two never collide
    /// in rendered macro-language text.
    pub fn load_var(&mut self, name: &str) -> Result<()> {
        self.goto(Some(name))?;
        let size = self.size_of(name)?;
        // `dist` lands the copy's destination exactly at `total_size`: the
        // expander's `copybinx` places its destination `dist` cells past the
        // source, so no further adjustment is needed here.
        let dist = self.total_size.sub(&self.position_of(Some(name)));
        self.emit(CodeFragment::Raw("copybinx(".to_string()));
        self.emit(CodeFragment::Expr(size));
        self.emit(CodeFragment::Raw(";".to_string()));
        self.emit(CodeFragment::Expr(dist));
        self.emit(CodeFragment::Raw(")".to_string()));
        self.goto(Some(name))
    }

    /// Moves the top `size(name)` cells down onto `name`'s position,
    /// destroying whatever was there, and leaves the cursor at
    /// `total_size` (the `downbinx` call never moves the symbolic
    /// cursor onto `name` — it just drains the top of the stack).
    pub fn push_var(&mut self, name: &str) -> Result<()> {
        self.goto(None)?;
        let size = self.size_of(name)?;
        let dist = self.total_size.sub(&self.position_of(Some(name)));
        self.emit(CodeFragment::Raw("downbinx(".to_string()));
        self.emit(CodeFragment::Expr(size));
        self.emit(CodeFragment::Raw(";".to_string()));
        self.emit(CodeFragment::Expr(dist));
        self.emit(CodeFragment::Raw(")".to_string()));
        self.cursor = None;
        Ok(())
    }

    /// Implements `do_call`: wires up argument loading, the invocation
    /// itself, and return-slot placement.
    #[allow(clippy::too_many_arguments)]
    pub fn do_call(
        &mut self,
        mut invocation: MacroInvocation,
        arg_names: &[Option<String>],
        arg_sizes: &[ConstExpr],
        ret_names: &[Option<String>],
        ret_sizes: &[ConstExpr],
    ) -> Result<MacroInvocation> {
        let base = self.total_size.clone();
        let mut v_params = Vec::new();
        for (name, size) in arg_names.iter().zip(arg_sizes) {
            match name {
                Some(n) => {
                    self.load_var(n)?;
                    let var_size = self.size_of(n)?;
                    self.comparisons.push((size.clone(), var_size.clone()));
                    v_params.push(var_size);
                }
                None => {
                    self.comparisons.push((size.clone(), size.clone()));
                    v_params.push(size.clone());
                }
            }
            self.total_size = self.total_size.add(size);
        }
        // Reset to `base`: the invocation itself operates starting at the
        // first loaded argument, and its return slots reuse that same
        // scratch span, exactly as `examples/original_source/VarfuckTranspiler.py`'s
        // `do_call` does (`self.size = base` after the argument-loading loop).
        self.total_size = base;
        invocation.set_v_params(v_params);
        invocation.set_ret(ret_sizes.to_vec());
        self.goto(None)?;
        self.emit(CodeFragment::Invocation(invocation.clone()));

        for (name, ret_size) in ret_names.iter().zip(ret_sizes) {
            match name {
                Some(n) if self.vars.contains_key(n) => {
                    self.clear_var(n)?;
                    self.push_var(n)?;
                }
                Some(n) => {
                    self.add_var(BinX::new(Some(n.clone()), ret_size.clone()), true);
                }
                None => self.clear_size(ret_size.clone()),
            }
            self.total_size = self.total_size.add(ret_size);
            self.cursor = None;
        }
        Ok(invocation)
    }

    /// The surface-language `fuck v1, v2, …` statement: moves each named
    /// variable into its corresponding synthetic return slot.
    pub fn fuck(&mut self, names: &[String]) -> Result<()> {
        for (i, name) in names.iter().enumerate() {
            self.load_var(name)?;
            self.clear_var(&i.to_string())?;
            self.goto(None)?;
            self.push_var(&i.to_string())?;
        }
        Ok(())
    }

    pub fn start_repeat(&mut self, n: ConstExpr) {
        self.emit(CodeFragment::Expr(n));
        self.emit(CodeFragment::Raw("repeat(".to_string()));
    }

    pub fn end_repeat(&mut self) {
        self.emit(CodeFragment::Raw(")".to_string()));
    }

    /// Opens a `while(prefix;body)` block: `prefix` is the condition
    /// variable's load-and-reduce code, which the expander re-splices
    /// before every loop-back so the condition is re-evaluated each
    /// iteration (see `examples/original_source/VarfuckTranspiler.py`'s
    /// `start_while`). The outer section reclaims the reduced condition
    /// cell once the loop is fully closed; the inner one scopes the body.
    pub fn start_while(&mut self, name: &str) -> Result<()> {
        self.add_section();
        self.emit(CodeFragment::Raw("while(".to_string()));
        self.load_var(name)?;
        self.goto(None)?;
        let size = self.size_of(name)?;
        self.emit(CodeFragment::Raw("boolbinx(".to_string()));
        self.emit(CodeFragment::Expr(size.clone()));
        self.emit(CodeFragment::Raw(")".to_string()));
        self.emit(CodeFragment::Raw(";".to_string()));
        self.total_size = self.total_size.add(&size);
        self.add_section();
        Ok(())
    }

    pub fn end_while(&mut self) -> Result<()> {
        self.pop_section()?;
        self.emit(CodeFragment::Raw(")".to_string()));
        self.pop_section()?;
        Ok(())
    }

    /// Opens an `ifel(then;else)` block: the condition variable is loaded
    /// into scratch and folded to a single boolean cell (`boolbinx`)
    /// before the dispatch, mirroring `start_while`. `continue_if` splits
    /// the then- and else-branch scopes; `end_if` closes both plus the
    /// outer reservation for the folded condition cell.
    pub fn start_if(&mut self, name: &str) -> Result<()> {
        self.add_section();
        self.load_var(name)?;
        self.goto(None)?;
        let size = self.size_of(name)?;
        self.emit(CodeFragment::Raw("boolbinx(".to_string()));
        self.emit(CodeFragment::Expr(size.clone()));
        self.emit(CodeFragment::Raw(")ifel(".to_string()));
        self.total_size = self.total_size.add(&size);
        self.add_section();
        Ok(())
    }

    pub fn continue_if(&mut self) -> Result<()> {
        self.pop_section()?;
        self.emit(CodeFragment::Raw(";".to_string()));
        self.add_section();
        Ok(())
    }

    pub fn end_if(&mut self) -> Result<()> {
        self.pop_section()?;
        self.emit(CodeFragment::Raw(")".to_string()));
        self.pop_section()?;
        Ok(())
    }

    /// Closes the bottom scope: clears every live variable in reverse
    /// allocation order, then (if there were parameters) moves the return
    /// slots down to offset 0.
    pub fn end(&mut self, had_params: bool) -> Result<()> {
        let names: Vec<String> = self
            .vars
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        for name in &names {
            if !had_params || self.ret_pos_var(name) {
                self.clear_var(name)?;
            }
        }
        if had_params {
            self.goto(None)?;
            self.emit(CodeFragment::Expr(self.ret_size.clone()));
            self.emit(CodeFragment::Raw("repeat(<".to_string()));
            self.emit(CodeFragment::Expr(self.ret_pos.clone()));
            self.emit(CodeFragment::Raw(">[-]<".to_string()));
            self.emit(CodeFragment::Expr(self.ret_pos.clone()));
            self.emit(CodeFragment::Raw(">[-])".to_string()));
        }
        Ok(())
    }

    fn ret_pos_var(&self, _name: &str) -> bool {
        true
    }
}

impl From<String> for CodeFragment {
    fn from(s: String) -> Self {
        CodeFragment::Raw(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_model::{Macro, MacroTable};

    #[test]
    fn params_and_returns_are_laid_out_low_to_high() {
        let mgr = StackManager::new(
            vec![BinX::new(Some("x".to_string()), ConstExpr::literal(1))],
            vec![ConstExpr::literal(2)],
        );
        assert_eq!(mgr.size_of("x").unwrap().render_string().unwrap(), "1");
        assert_eq!(mgr.size_of("0").unwrap().render_string().unwrap(), "2");
        assert_eq!(mgr.total_size.render_string().unwrap(), "3");
    }

    #[test]
    fn goto_is_a_no_op_when_already_there() {
        let mut mgr = StackManager::new(vec![BinX::new(Some("x".to_string()), ConstExpr::literal(1))], Vec::new());
        let before = mgr.code.len();
        mgr.goto(Some("x")).unwrap();
        assert_eq!(mgr.code.len(), before);
    }

    #[test]
    fn goto_unknown_variable_is_an_error() {
        let mut mgr = StackManager::new(Vec::new(), Vec::new());
        assert!(mgr.goto(Some("nope")).is_err());
    }

    #[test]
    fn add_section_and_pop_section_emit_a_clearing_loop() {
        let mut mgr = StackManager::new(Vec::new(), Vec::new());
        mgr.add_section();
        mgr.add_var(BinX::new(Some("t".to_string()), ConstExpr::literal(1)), true);
        mgr.total_size = mgr.total_size.add(&ConstExpr::literal(1));
        mgr.pop_section().unwrap();
        assert!(mgr.code.iter().any(|f| matches!(f, CodeFragment::Raw(s) if s.contains("repeat"))));
    }

    #[test]
    fn do_call_threads_comparisons_through() {
        let mut table = MacroTable::new();
        let id = table.insert(Macro::new_builtin("noop".to_string(), Vec::new(), Vec::new(), Vec::new()));
        let mut mgr = StackManager::new(Vec::new(), Vec::new());
        let invocation = MacroInvocation::new(id, "noop".to_string(), Vec::new());
        mgr.do_call(invocation, &[], &[], &[], &[]).unwrap();
        assert!(mgr.comparisons.is_empty());
    }

    #[test]
    fn clear_var_leaves_the_cursor_at_the_variable_so_a_later_goto_is_free() {
        let mut mgr = StackManager::new(vec![BinX::new(Some("x".to_string()), ConstExpr::literal(3))], Vec::new());
        mgr.clear_var("x").unwrap();
        let before = mgr.code.len();
        mgr.goto(Some("x")).unwrap();
        assert_eq!(mgr.code.len(), before, "goto right after clear_var should be a no-op: the pointer is already back at x");
    }

    #[test]
    fn clear_var_emits_a_retreat_after_the_clearing_loop() {
        let mut mgr = StackManager::new(vec![BinX::new(Some("x".to_string()), ConstExpr::literal(3))], Vec::new());
        mgr.clear_var("x").unwrap();
        let raws: Vec<&str> =
            mgr.code.iter().filter_map(|f| match f { CodeFragment::Raw(s) => Some(s.as_str()), _ => None }).collect();
        assert!(raws.contains(&"repeat([-]>)"));
        assert!(raws.contains(&"<"), "clear_var must walk the pointer back after the clearing loop");
    }

    #[test]
    fn fuck_loads_the_source_variable_before_draining_into_the_return_slot() {
        let mut mgr = StackManager::new(
            vec![BinX::new(Some("x".to_string()), ConstExpr::literal(4))],
            vec![ConstExpr::literal(4)],
        );
        mgr.fuck(&["x".to_string()]).unwrap();
        let raws: Vec<&str> =
            mgr.code.iter().filter_map(|f| match f { CodeFragment::Raw(s) => Some(s.as_str()), _ => None }).collect();
        let copy_pos = raws.iter().position(|s| s.starts_with("copybinx")).expect("load_var should emit copybinx");
        let clear_pos = raws.iter().position(|s| *s == "repeat([-]>)").expect("clear_var should emit its clearing loop");
        let drain_pos = raws.iter().position(|s| s.starts_with("downbinx")).expect("push_var should emit downbinx");
        assert!(copy_pos < clear_pos, "the source variable must be loaded before its slot is cleared");
        assert!(clear_pos < drain_pos, "the slot must be cleared before the drain moves the loaded value into it");
        assert_eq!(mgr.cursor, None, "push_var always leaves the cursor at the top of the stack");
    }
}
