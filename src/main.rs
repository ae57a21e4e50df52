//! Paranoid CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paranoid_engine::cli::{Cli, Commands, OutputFormat};
use paranoid_engine::commands::{
    self, render_structured_error, CommandContext, CommandOutcome,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let ctx = CommandContext {
        format: cli.format,
        verbose: cli.verbose,
    };

    let result = match &cli.command {
        Commands::Init(args) => commands::run_init(&ctx, args),
        Commands::Summarize(args) => commands::run_summarize_command(&ctx, args),
        Commands::Analyze(args) => commands::run_analyze(&ctx, args),
        Commands::Index(args) => commands::run_index_command(&ctx, args),
        Commands::Ask(args) => commands::run_ask_command(&ctx, args),
        Commands::Stats(args) => commands::run_stats(&ctx, args),
        Commands::Clean(args) => commands::run_clean(&ctx, args),
    };

    match result {
        Ok(CommandOutcome {
            output,
            failed_items,
        }) => {
            println!("{}", output);
            if failed_items > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            match ctx.format {
                OutputFormat::Json => println!("{}", render_structured_error(&error)),
                OutputFormat::Text => eprintln!("Error: {}", error),
            }
            error.exit_code()
        }
    }
}
