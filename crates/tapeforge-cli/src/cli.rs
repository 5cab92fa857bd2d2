//! Argument parsing for the `tapeforge` binary.
//!
//! Uses `clap`'s derive API (`plotnik-cli` builds `clap::Arg`s
//! by hand; this pipeline has only three actions and a handful of flags
//! apiece, so the derive macros are the better fit for that smaller
//! surface).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "tapeforge", about = "Compile and run the Tapeforge surface language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lex, parse, and clean a source file; print the resulting CST.
    Parse {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Compile a source file to macro-language (or expanded target-ISA) text.
    Build {
        file: PathBuf,
        /// Print the unexpanded macro-language text instead of expanding it.
        #[arg(long)]
        no_expand: bool,
    },
    /// Compile and execute a source file, wiring stdin/stdout to `,`/`.`.
    Run {
        file: PathBuf,
        /// Override the computed minimum tape size.
        #[arg(long)]
        tape_size: Option<usize>,
        /// Print the final tape contents to stderr after execution.
        #[arg(long)]
        dump_tape: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_text_format() {
        let cli = Cli::try_parse_from(["tapeforge", "parse", "foo.tf"]).unwrap();
        match cli.command {
            Command::Parse { file, format } => {
                assert_eq!(file, PathBuf::from("foo.tf"));
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected Parse"),
        }
    }

    #[test]
    fn parse_accepts_json_format() {
        let cli = Cli::try_parse_from(["tapeforge", "parse", "foo.tf", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Command::Parse { format: OutputFormat::Json, .. }));
    }

    #[test]
    fn build_accepts_no_expand_flag() {
        let cli = Cli::try_parse_from(["tapeforge", "build", "foo.tf", "--no-expand"]).unwrap();
        assert!(matches!(cli.command, Command::Build { no_expand: true, .. }));
    }

    #[test]
    fn run_accepts_tape_size_and_dump_tape() {
        let cli = Cli::try_parse_from(["tapeforge", "run", "foo.tf", "--tape-size", "64", "--dump-tape"]).unwrap();
        match cli.command {
            Command::Run { tape_size, dump_tape, .. } => {
                assert_eq!(tape_size, Some(64));
                assert!(dump_tape);
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn missing_file_argument_is_rejected() {
        assert!(Cli::try_parse_from(["tapeforge", "run"]).is_err());
    }
}
