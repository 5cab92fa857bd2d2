//! End-to-end tests for the three subcommands, run in-process against
//! temporary files rather than by spawning the compiled binary (mirrors
//! `plotnik-cli`'s `dispatch_tests`, which drives `clap` commands directly).

use std::io::Write as _;

use tempfile::NamedTempFile;

use super::{build, parse, run};
use crate::cli::OutputFormat;

const EMIT_BYTE_65: &str = "macro main[]() -> () { \
    call implant(8, 65)() () -> (ch); \
    call printbinx(8)(ch) (); \
} call main() ()";

fn source_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn parse_succeeds_on_valid_source() {
    let file = source_file(EMIT_BYTE_65);
    assert_eq!(parse::run(file.path(), OutputFormat::Text), 0);
}

#[test]
fn parse_reports_failure_on_invalid_source() {
    let file = source_file("macro main[( { this is not tapeforge");
    assert_eq!(parse::run(file.path(), OutputFormat::Json), 1);
}

#[test]
fn build_emits_macro_text_without_expansion() {
    let file = source_file(EMIT_BYTE_65);
    assert_eq!(build::run(file.path(), true), 0);
}

#[test]
fn build_expands_to_target_isa_text() {
    let file = source_file(EMIT_BYTE_65);
    assert_eq!(build::run(file.path(), false), 0);
}

#[test]
fn run_compiles_and_executes_emit_byte_65() {
    let file = source_file(EMIT_BYTE_65);
    assert_eq!(run::run(file.path(), None, true), 0);
}

#[test]
fn run_rejects_a_source_file_that_does_not_exist() {
    let missing = std::path::PathBuf::from("/nonexistent/does-not-exist.tf");
    assert_eq!(run::run(&missing, None, false), 1);
}
