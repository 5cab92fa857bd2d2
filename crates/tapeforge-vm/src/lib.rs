//! Macro-language expander and tape-machine interpreter for compiled
//! Tapeforge programs.
//!
//! `tapeforge-compiler` turns surface source into macro-language text built
//! entirely out of this crate's builtin catalog (every user-defined macro
//! is inlined away before the text reaches here); this crate parses that
//! text (via `tapeforge-isa`), expands it into the eight-instruction target
//! ISA, and can run the result against in-memory I/O buffers.

pub mod builtins;
pub mod codegen;
pub mod error;
pub mod expander;
pub mod interpreter;

pub use error::{Error, Result};
pub use interpreter::{FuelLimits, Interpreter, RunOutput, VMBuilder};

use tapeforge_isa::Program;

/// Parses and expands macro-language source into a runnable [`Program`] in
/// one step.
pub fn expand(source: &str) -> Result<Program> {
    let items = tapeforge_isa::parse(source)?;
    expander::expand_program(&items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_and_run_implant_then_print() {
        let program = expand("implant(8;65)printbinx(8)").unwrap();
        let mut vm = Interpreter::builder().build(&program).unwrap();
        let out = vm.run(&[]).unwrap();
        assert_eq!(out.output, vec![65]);
    }

    #[test]
    fn expand_rejects_syntax_errors() {
        assert!(expand("implant(8;65").is_err());
    }
}
