mod cli;
mod commands;
mod error;

use clap::Parser;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Parse { file, format } => commands::parse::run(&file, format),
        Command::Build { file, no_expand } => commands::build::run(&file, no_expand),
        Command::Run { file, tape_size, dump_tape } => commands::run::run(&file, tape_size, dump_tape),
    };
    std::process::exit(code);
}
