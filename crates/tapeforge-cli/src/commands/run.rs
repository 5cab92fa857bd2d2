//! `tapeforge run <file>`: compiles, expands, and executes a source file,
//! wiring stdin/stdout to the tape machine's `,`/`.`.

use std::io::{Read, Write};
use std::path::Path;

use tapeforge_vm::Interpreter;

use crate::commands::{print_diagnostics, read_source, EXIT_FAILURE};

pub fn run(file: &Path, tape_size: Option<usize>, dump_tape: bool) -> i32 {
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

    let program = match tapeforge_vm::expand(&macro_text) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", crate::error::render_vm_error(&e));
            return EXIT_FAILURE;
        }
    };

    let mut builder = Interpreter::builder();
    if let Some(size) = tape_size {
        builder = builder.tape_size(size);
    }
    let mut vm = match builder.build(&program) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("{}", crate::error::render_vm_error(&e));
            return EXIT_FAILURE;
        }
    };

    let mut input = Vec::new();
    if std::io::stdin().read_to_end(&mut input).is_err() {
        eprintln!("error: could not read stdin");
        return EXIT_FAILURE;
    }

    match vm.run(&input) {
        Ok(output) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            if handle.write_all(&output.output).is_err() {
                eprintln!("error: could not write stdout");
                return EXIT_FAILURE;
            }
            if dump_tape {
                eprintln!("tape: {:?}", output.tape);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", crate::error::render_vm_error(&e));
            EXIT_FAILURE
        }
    }
}
