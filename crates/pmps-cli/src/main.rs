//! pmpsdb CLI
//!
//! Deploys PMPS database exports to PLCs and verifies the deployed copies.
//!
//! # Exit codes
//!
//! - `0`: every host clean
//! - `2`: the run completed but something needs attention
//! - `1`: the command could not run at all

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;
use pmps_core::Action;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.global.verbose) {
        eprintln!("{}: could not set up logging: {}", "warning".yellow().bold(), e);
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let Some(command) = cli.command else {
        // No command provided - show help hint
        println!("{} PMPS database deployment", "pmpsdb".green().bold());
        println!();
        println!("Run {} for available commands.", "pmpsdb --help".cyan());
        return Ok(0);
    };

    let context = Context::load(&cli.global)?;
    tracing::debug!(hosts = context.config.hosts.len(), transport = ?context.config.transport, "Configuration resolved");

    match command {
        Commands::Hosts { probe } => commands::run_hosts(&context, probe).await,
        Commands::Verify(args) => commands::run_action(&context, Action::Verify, &args, interrupt_token()).await,
        Commands::Push(args) => commands::run_action(&context, Action::Push, &args, interrupt_token()).await,
        Commands::Pull(args) => commands::run_action(&context, Action::Pull, &args, interrupt_token()).await,
        Commands::Plc(args) => commands::run_plc(&context, &args).await,
    }
}

/// A token cancelled on Ctrl-C, so an interrupted run still reports.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining work");
            trigger.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[tokio::test]
    async fn test_no_command_is_success() {
        let cli = Cli::parse_from(["pmpsdb"]);
        assert_eq!(run(cli).await.unwrap(), 0);
    }
}
