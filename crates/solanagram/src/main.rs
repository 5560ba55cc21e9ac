// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Solanagram - Telegram session orchestrator and worker fleet controller.
//!
//! This is the binary entry point for the orchestrator process.

mod cleanup;
mod serve;

use clap::{Parser, Subcommand};

use solanagram_config::{load_config, validate, Severity};

/// Solanagram - Telegram session orchestrator and worker fleet controller.
#[derive(Parser, Debug)]
#[command(name = "solanagram", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the orchestrator: gateway, bridge, supervisor and cleanup loops.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Check configuration and report diagnostics without starting.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Migrate => {
            serve::init_tracing(&config.log_level);
            match solanagram_storage::Database::open(&config.database_url).await {
                Ok(_db) => println!("migrations applied"),
                Err(e) => {
                    eprintln!("error: migration failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Doctor => {
            let findings = validate(&config);
            if findings.is_empty() {
                println!("configuration ok");
                return;
            }
            let mut fatal = false;
            for finding in &findings {
                println!("{finding}");
                fatal |= finding.severity == Severity::Error;
            }
            if fatal {
                std::process::exit(1);
            }
        }
    }
}
