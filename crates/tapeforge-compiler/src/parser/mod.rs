pub mod cleaner;
pub mod matcher;

use tapeforge_core::{CstNode, Grammar};

use crate::error::Error;
use crate::lexer::Lexer;

pub use matcher::SubstitutionTables;

/// Parses `source` against `grammar`, then runs the CST cleaner over the
/// result. This is the single entry point the processor and the CLI's
/// `parse` subcommand use.
pub fn parse(grammar: &Grammar, tables: &SubstitutionTables, source: &str) -> Result<CstNode, Error> {
    let mut lexer = Lexer::new(source);
    let tree = matcher::parse_with(grammar, tables, &mut lexer)?;
    Ok(cleaner::clean(tree))
}
