//! Softcascade Command-Line Client
//!
//! Validates relationship models and runs soft-delete cascades against JSON
//! data fixtures.

mod commands;
mod config;
mod error;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::DeleteArgs;
use error::CliError;
use formatter::OutputFormat;

/// Softcascade Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "softcascade")]
#[command(version, about = "Soft-delete cascade resolver")]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the catalog and check every soft-delete declaration.
    Check {
        /// Model definition (JSON).
        #[arg(short, long)]
        model: PathBuf,
    },

    /// List the associations visited when an entity type is soft-deleted.
    Describe {
        /// Model definition (JSON).
        #[arg(short, long)]
        model: PathBuf,

        /// Entity type name.
        #[arg(short, long)]
        entity: String,
    },

    /// Soft-delete one entity of a data fixture and print the mutations.
    Delete(DeleteArgs),
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "softcascade=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let formatter = formatter::create_formatter(cli.format);

    match cli.command {
        Command::Check { model } => commands::check(&model, &*formatter),
        Command::Describe { model, entity } => commands::describe(&model, &entity, &*formatter),
        Command::Delete(args) => commands::delete(args, &*formatter),
    }
}
