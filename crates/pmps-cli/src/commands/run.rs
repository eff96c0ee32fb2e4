//! Verify, push and pull command implementation

use colored::Colorize;
use pmps_core::registry::HostRegistry;
use pmps_core::{Action, FileSelection, Orchestrator, Outcome, RunReport, format_text, to_json};
use tokio_util::sync::CancellationToken;

use super::hosts::print_errors;
use crate::cli::RunArgs;
use crate::context::Context;
use crate::error::{CliError, Result};

/// Run `action` against the selected hosts and print the report.
///
/// Returns the process exit code: 0 when every host is clean, 2 when
/// anything needs attention.
pub async fn run_action(context: &Context, action: Action, args: &RunArgs, cancel: CancellationToken) -> Result<i32> {
    let export_dir = context.export_dir()?;

    let discovery = context.registry().discover().await;
    let (mut hosts, unknown) = discovery.select(&args.hosts);
    for name in unknown {
        tracing::info!(host = %name, "Host not configured, using default settings");
        hosts.push(context.host(&name));
    }
    if hosts.is_empty() {
        return Err(CliError::user(
            "no hosts to run against (configure [[hosts]], set PMPSDB_HOSTS or pass --host)",
        ));
    }

    let mut options = context.config.run_options(action)?.dry_run(args.dry_run).cancel_token(cancel);
    if !args.files.is_empty() {
        options = options.selection(FileSelection::names(args.files.iter().cloned()));
    }

    let orchestrator = Orchestrator::new(context.connector()?);
    let report = orchestrator.run(&export_dir, hosts, &options).await?;

    if context.json {
        let mut value = to_json(&report)?;
        if !discovery.errors.is_empty() {
            value["discovery_errors"] = serde_json::to_value(&discovery.errors)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_report(&report);
        print_errors(&discovery.errors);
    }

    let mut outcome = report.outcome();
    if !discovery.errors.is_empty() {
        outcome = Outcome::Warnings;
    }
    Ok(outcome.exit_code())
}

fn print_report(report: &RunReport) {
    print!("{}", format_text(report));
    println!();
    match report.outcome() {
        Outcome::Clean => println!("{} All hosts in order.", "OK".green().bold()),
        Outcome::Warnings => println!(
            "{} Some hosts need attention. See errors above.",
            "WARN".yellow().bold()
        ),
    }
    if report.dry_run {
        println!("Dry run: nothing was transferred.");
    }
}
