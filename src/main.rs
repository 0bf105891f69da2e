//! `vidanno` command-line tool.

use std::process::ExitCode;

use clap::Parser;
use vidanno::ProviderRegistry;
use vidanno::cli::{self, Cli};

fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.preferences.log_level.to_level_filter()
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let providers = ProviderRegistry::new();
    match cli::run(&args, &config, &providers, &mut std::io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
