use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repo_guard_cli::commands::{
    apply_cmd::{self, ApplyArgs},
    init_cmd::{self, InitArgs},
};
use repo_guard_cli::errors::Error;
use repo_guard_cli::report::{exit_code, EXIT_FATAL, EXIT_SUCCESS};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// repo-guard CLI: Apply branch protection, merge settings and Actions secrets to a GitHub
/// repository
#[derive(Parser)]
#[command(name = "repo-guard")]
#[command(
    about = "Idempotently provision branch protection, merge settings and secrets for a GitHub repository",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a provisioning plan to a repository
    Apply(ApplyArgs),

    /// Write the built-in plan to a file
    Init(InitArgs),

    /// Show the CLI version
    Version,
}

fn print_and_flush(output: &str) -> Result<(), Error> {
    print!("{}", output);
    io::stdout().flush().map_err(|_| Error::StdOutFlushFailed)
}

async fn apply(args: &ApplyArgs) -> Result<i32, Error> {
    let report = apply_cmd::execute(args).await?;
    print_and_flush(&apply_cmd::render(args, &report)?)?;
    Ok(exit_code(&report))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_env("REPO_GUARD_LOG"))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Apply(args) => match apply(args).await {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                error!("Error: {e}");
                eprintln!("Error: {e}");
                std::process::exit(EXIT_FATAL);
            }
        },
        Commands::Init(args) => match init_cmd::execute(args) {
            Ok(path) => {
                println!("Wrote the built-in plan to {}", path.display());
                std::process::exit(EXIT_SUCCESS);
            }
            Err(e) => {
                error!("Error: {e}");
                eprintln!("Error: {e}");
                std::process::exit(EXIT_FATAL);
            }
        },
        Commands::Version => {
            // Print version info from baked-in value
            println!(
                "repo-guard version {}",
                option_env!("REPO_GUARD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            std::process::exit(EXIT_SUCCESS);
        }
    }
}
