//! `tapeforge build <file>`: compiles a source file to macro-language text,
//! expanding it to raw target-ISA text unless `--no-expand` is given.

use std::path::Path;

use crate::commands::{print_diagnostics, read_source, EXIT_FAILURE};

pub fn run(file: &Path, no_expand: bool) -> i32 {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let macro_text = match tapeforge_compiler::compile_with_diagnostics(&source) {
        Ok((text, diagnostics)) => {
            print_diagnostics(&diagnostics);
            text
        }
        Err(e) => {
            eprintln!("{}", crate::error::render_compiler_error(&e, &source, &file.display().to_string()));
            return EXIT_FAILURE;
        }
    };

    if no_expand {
        println!("{macro_text}");
        return 0;
    }

    match tapeforge_vm::expand(&macro_text) {
        Ok(program) => {
            println!("{}", program.to_source());
            0
        }
        Err(e) => {
            eprintln!("{}", crate::error::render_vm_error(&e));
            EXIT_FAILURE
        }
    }
}
