use std::process;
mod call;
mod cli;
mod error;
mod exit_codes;
mod list;
mod show_config;

use clap::CommandFactory;
use cli::{Cli, Commands};
use error::handle_cli_result;
use exit_codes::{EXIT_SUCCESS, EXIT_USAGE_ERROR};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let Some(command) = cli.command else {
        let exit_code = match Cli::command().print_help() {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_USAGE_ERROR,
        };
        process::exit(exit_code);
    };

    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::TRACE
    } else {
        Level::WARN
    };

    // RUST_LOG takes over when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let config_path = cli.config.as_deref();
    let exit_code = match command {
        Commands::List { format } => {
            tracing::debug!("Listing tools");
            handle_cli_result(list::run_list_command(format))
        }
        Commands::Call { tool, arguments } => {
            tracing::debug!("Calling tool {}", tool);
            handle_cli_result(
                call::run_call_command(&tool, arguments.as_deref(), config_path).await,
            )
        }
        Commands::Config => handle_cli_result(show_config::run_config_command(config_path)),
    };

    process::exit(exit_code);
}
