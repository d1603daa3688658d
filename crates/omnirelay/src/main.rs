// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Omnirelay - omnichannel message router.
//!
//! This is the binary entry point for the Omnirelay server.

use clap::{Parser, Subcommand};

mod serve;

/// Omnirelay - omnichannel message router.
#[derive(Parser, Debug)]
#[command(name = "omnirelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Omnirelay server (gateway + workers).
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match omnirelay_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("omnirelay: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("omnirelay serve: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("omnirelay: use --help for available commands");
        }
    }
}
