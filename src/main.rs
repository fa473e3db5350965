//! goatlas CLI entry point.

use clap::Parser;
use goatlas::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Analyze(args) => {
            cli::init_logging(args.verbose);
            match cli::run_analyze(&args) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Init(args) => match cli::run_init(&args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
    };

    std::process::exit(exit_code);
}
