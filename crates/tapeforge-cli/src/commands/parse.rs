//! `tapeforge parse <file>`: lex, parse, and clean a source file, printing
//! the resulting CST as indented text or JSON.

use std::path::Path;

use tapeforge_core::CstNode;
use tapeforge_compiler::{grammars, parser};

use crate::cli::OutputFormat;
use crate::commands::{read_source, EXIT_FAILURE};

pub fn run(file: &Path, format: OutputFormat) -> i32 {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let grammar = grammars::surface_grammar();
    let tables = grammars::default_tables();
    match parser::parse(&grammar, &tables, &source) {
        Ok(tree) => {
            match format {
                OutputFormat::Text => print_text(&tree, 0),
                OutputFormat::Json => match serde_json::to_string_pretty(&tree) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: could not serialize CST: {e}");
                        return EXIT_FAILURE;
                    }
                },
            }
            0
        }
        Err(e) => {
            eprintln!("{}", crate::error::render_compiler_error(&e, &source, &file.display().to_string()));
            EXIT_FAILURE
        }
    }
}

fn print_text(node: &CstNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        CstNode::Leaf(token) => println!("{indent}{:?} {:?}", token.kind, token.text),
        CstNode::Nonterminal { rule, children } => {
            println!("{indent}{rule}");
            for child in children {
                print_text(child, depth + 1);
            }
        }
    }
}
