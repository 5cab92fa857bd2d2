//! Front end for the surface language: lexing, backtracking parse, CST
//! cleanup, and AST-to-macro-language translation.
//!
//! The pipeline's public entry point, [`compile`], turns surface source text
//! into macro-language text (the textual superset of the 8-op tape ISA that
//! `tapeforge-isa` models and `tapeforge-vm` expands and executes).

pub mod builtins;
pub mod constexpr;
pub mod diagnostics;
pub mod error;
pub mod grammars;
pub mod lexer;
pub mod macro_model;
pub mod parser;
pub mod processor;
pub mod stack_manager;

use std::collections::HashMap;

pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use macro_model::{Macro, MacroId, MacroInvocation, MacroTable};
pub use processor::Processor;

/// Parses, cleans, and translates `source`, then renders the entry-point
/// invocation (with no outer bindings) into macro-language text, discarding
/// any advisory diagnostics collected along the way. Callers that want to
/// report those (the CLI's `build`/`run` subcommands) should use
/// [`compile_with_diagnostics`] instead.
pub fn compile(source: &str) -> Result<String> {
    compile_with_diagnostics(source).map(|(text, _)| text)
}

/// Same pipeline as [`compile`], but also returns the `Diagnostics`
/// collected while processing `source` (currently: declared-but-never-called
/// macro warnings).
pub fn compile_with_diagnostics(source: &str) -> Result<(String, Diagnostics)> {
    let grammar = grammars::surface_grammar();
    let tables = grammars::default_tables();
    let tree = parser::parse(&grammar, &tables, source)?;

    let mut processor = Processor::new();
    let entry = processor.process(&tree)?;
    let rendered = entry.render(&HashMap::new(), &processor.macros)?;
    Ok((rendered, processor.diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_program_to_a_call_template() {
        let rendered = compile("macro main[]() -> () {} call main() ()").unwrap();
        assert_eq!(rendered, "");
    }

    #[test]
    fn compiles_a_program_that_prints_a_byte() {
        let rendered = compile(
            "macro main[]() -> () { call implant(8, 65)() () -> (ch); call printbinx(8)(ch) (); } \
             call main() ()",
        )
        .unwrap();
        assert!(rendered.contains("implant(8;65)"));
        assert!(rendered.contains("printbinx(8)"));
    }

    #[test]
    fn warns_about_a_macro_that_is_never_called() {
        let (_, diagnostics) = compile_with_diagnostics(
            "macro helper[]() -> () {} macro main[]() -> () {} call main() ()",
        )
        .unwrap();
        let messages: Vec<String> = diagnostics.iter().map(|m| m.message.clone()).collect();
        assert_eq!(messages, vec!["macro `helper` is never called"]);
    }

    #[test]
    fn no_diagnostics_when_every_macro_is_called() {
        let (_, diagnostics) = compile_with_diagnostics("macro main[]() -> () {} call main() ()").unwrap();
        assert!(diagnostics.is_empty());
    }
}
