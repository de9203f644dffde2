//! polyquery: run SQL against Athena, Trino, Presto or MySQL from one command.
//!
//! # Commands
//!
//! - `query`: Initialize the named backend from the config and run one statement.
//! - `validate`: Check every backend section of the config without connecting.
//!
//! Configuration comes from `--config`, `POLYQUERY_CONFIG` or
//! `config/polyquery.yaml`, overlaid with `POLYQUERY_*` environment variables.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;

mod commands;
mod config;
mod exit_codes;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "polyquery")]
#[command(about = "Query Athena, Trino, Presto and MySQL through one interface", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query against one backend
    Query {
        /// Backend name: athena, trino, presto or mysql
        #[arg(long, short)]
        backend: String,
        /// Drop the header row Athena returns as the first data row
        #[arg(long, default_value_t = false)]
        skip_header: bool,
        /// The SQL statement to run
        sql: String,
    },
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run_cli(&cli).await {
        let exit_code = exit_codes::for_error(&e);
        if cli.output.is_machine_readable() {
            output::print_error(cli.output, &e, exit_code).ok();
        } else {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run_cli(cli: &Cli) -> Result<(), anyhow::Error> {
    let (config_file, config) = config::load(cli.config.as_deref())?;
    polyquery_common::telemetry::init_tracing(&config.logging.level)?;

    match &cli.command {
        Commands::Query {
            backend,
            skip_header,
            sql,
        } => {
            commands::query(sql, backend, *skip_header, cli.output, &config).await?;
        }
        Commands::Validate => {
            commands::validate(&config_file, &config, cli.output).await?;
        }
    }
    Ok(())
}
