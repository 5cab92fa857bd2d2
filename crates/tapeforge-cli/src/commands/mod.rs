pub mod build;
pub mod parse;
pub mod run;

#[cfg(test)]
mod pipeline_tests;

/// Exit code convention shared by every subcommand: `0` on success, `1` on
/// any reported error, matching `plotnik-cli::commands`' modules.
pub const EXIT_FAILURE: i32 = 1;

pub fn read_source(path: &std::path::Path) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|e| {
        eprintln!("error: could not read {}: {e}", path.display());
        EXIT_FAILURE
    })
}

/// Prints every advisory diagnostic (e.g. declared-but-never-called macro
/// warnings) to stderr; fatal errors are reported separately via
/// `crate::error`, since those abort the pipeline instead of accumulating.
pub fn print_diagnostics(diagnostics: &tapeforge_compiler::Diagnostics) {
    for message in diagnostics.iter() {
        eprintln!("{message}");
    }
}
