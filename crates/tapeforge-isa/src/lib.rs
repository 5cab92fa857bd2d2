//! Shared wire format between the Tapeforge compiler and VM: the raw
//! 8-instruction target ISA, and the macro language layered on top of it
//! (counted repetition, named parameterized invocation).

pub mod instr;
pub mod macro_lang;

pub use instr::{Instr, Program};
pub use macro_lang::{parse, MacroItem, MacroParser, MacroSyntaxError, MacroToken};
