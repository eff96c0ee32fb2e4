//! Hosts command implementation

use colored::Colorize;
use pmps_core::registry::{Discovery, HostRegistry, ProbeOptions, probe};
use pmps_core::{ErrorRecord, Outcome};

use crate::context::Context;
use crate::error::Result;

/// List the hosts the registry knows, optionally probing each one.
pub async fn run_hosts(context: &Context, probe_hosts: bool) -> Result<i32> {
    let mut discovery = context.registry().discover().await;
    if probe_hosts {
        let options = ProbeOptions {
            port: context.config.port,
            ..ProbeOptions::default()
        };
        probe(&mut discovery, &options).await;
    }

    if context.json {
        println!("{}", serde_json::to_string_pretty(&discovery)?);
    } else {
        print_hosts(&discovery, probe_hosts);
    }

    Ok(if discovery.errors.is_empty() {
        Outcome::Clean.exit_code()
    } else {
        Outcome::Warnings.exit_code()
    })
}

fn print_hosts(discovery: &Discovery, probed: bool) {
    if discovery.hosts.is_empty() {
        println!("{}", "No hosts configured".yellow());
        println!();
        println!(
            "Add [[hosts]] to a config file, pass {} or set {}.",
            "--config".cyan(),
            "PMPSDB_HOSTS".cyan()
        );
    } else {
        let width = discovery
            .hosts
            .iter()
            .map(|h| h.hostname.len())
            .max()
            .unwrap_or(0)
            .max("HOSTNAME".len());
        println!(
            "{:<width$}  {:<16}  {:<10}  {:<18}  {}",
            "HOSTNAME".bold(),
            "ADDRESS".bold(),
            "GROUPS".bold(),
            "IOC PREFIX".bold(),
            "REMOTE PATH".bold()
        );
        for host in &discovery.hosts {
            let status = match (probed, host.reachable) {
                (false, _) => String::new(),
                (true, true) => format!("  {}", "online".green()),
                (true, false) => format!("  {}", "offline".red()),
            };
            println!(
                "{:<width$}  {:<16}  {:<10}  {:<18}  {}{}",
                host.hostname.cyan(),
                host.address,
                host.groups.join(","),
                host.ioc_prefix.as_deref().unwrap_or("-"),
                host.remote_path,
                status
            );
        }
    }

    print_errors(&discovery.errors);
}

pub(crate) fn print_errors(errors: &[ErrorRecord]) {
    if errors.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("{}", "Discovery errors:".red().bold());
    for error in errors {
        eprintln!("  {} {} [{}] {}", "!".red(), error.host, error.kind, error.message);
    }
}
