//! Single-PLC operations
//!
//! Direct access to one host's database directory without reconciliation:
//! listing, download to stdout, atomic upload and a digest comparison with
//! the export directory.

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use pmps_core::{HostDescriptor, Outcome};
use pmps_fs::io::read_bytes;
use pmps_fs::{fingerprint_bytes, fingerprint_file};
use pmps_transport::{RemoteEntry, Transport, is_temp_artifact};
use serde_json::json;

use crate::cli::PlcArgs;
use crate::context::Context;
use crate::error::{CliError, Result};

/// Run the requested operations against one PLC, closing the session on
/// every path.
pub async fn run_plc(context: &Context, args: &PlcArgs) -> Result<i32> {
    let host = context.host(&args.hostname);
    let mut transport = context.connector()?.connect(&host)?;

    let result = run_operations(context, &host, args, transport.as_mut()).await;

    if let Err(e) = transport.close().await {
        tracing::warn!(host = %host.hostname, error = %e, "Closing transport failed");
    }
    result
}

async fn run_operations(
    context: &Context,
    host: &HostDescriptor,
    args: &PlcArgs,
    transport: &mut dyn Transport,
) -> Result<i32> {
    let nothing_requested = !args.list && args.download.is_none() && args.upload.is_none() && args.compare.is_none();
    let mut exit_code = Outcome::Clean.exit_code();

    if args.list || nothing_requested {
        let entries = transport.list(&host.remote_path).await?;
        print_listing(context, host, &entries)?;
    }

    if let Some(name) = &args.download {
        let name = name.clone().unwrap_or_else(|| host.db_file_name());
        let content = transport.read(&host.remote_path, &name).await?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&content)?;
        stdout.flush()?;
    }

    if let Some(path) = &args.upload {
        upload(context, host, path, transport).await?;
    }

    if let Some(name) = &args.compare {
        let name = name.clone().unwrap_or_else(|| host.db_file_name());
        exit_code = exit_code.max(compare(context, host, &name, transport).await?);
    }

    Ok(exit_code)
}

fn print_listing(context: &Context, host: &HostDescriptor, entries: &[RemoteEntry]) -> Result<()> {
    if context.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    println!("{} {}:{}", "Listing".bold(), host.hostname.cyan(), host.remote_path);
    if entries.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for entry in entries {
        let modified = entry
            .modified_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        if is_temp_artifact(&entry.name) {
            println!(
                "  {:>10}  {}  {} {}",
                entry.size,
                modified.dimmed(),
                entry.name,
                "(interrupted upload)".yellow()
            );
        } else {
            println!("  {:>10}  {}  {}", entry.size, modified.dimmed(), entry.name);
        }
    }
    Ok(())
}

async fn upload(context: &Context, host: &HostDescriptor, path: &Path, transport: &mut dyn Transport) -> Result<()> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::user(format!("cannot upload {}: not a file name", path.display())))?;
    let content = read_bytes(path)?;

    transport.write(&host.remote_path, name, &content).await?;

    if context.json {
        println!(
            "{}",
            json!({ "host": host.hostname, "file": name, "bytes": content.len(), "uploaded": true })
        );
    } else {
        println!(
            "{} Uploaded {} ({} bytes) to {}",
            "OK".green().bold(),
            name.cyan(),
            content.len(),
            host.hostname
        );
    }
    Ok(())
}

async fn compare(context: &Context, host: &HostDescriptor, name: &str, transport: &mut dyn Transport) -> Result<i32> {
    let local_path = context.export_dir()?.join(name);
    let local = fingerprint_file(&local_path)?;
    let remote = fingerprint_bytes(&transport.read(&host.remote_path, name).await?);
    let identical = local == remote;

    if context.json {
        println!(
            "{}",
            json!({
                "host": host.hostname,
                "file": name,
                "local": { "digest": local.digest, "size": local.size },
                "remote": { "digest": remote.digest, "size": remote.size },
                "identical": identical,
            })
        );
    } else if identical {
        println!("{} {} matches {}", "SAME".green().bold(), name.cyan(), host.hostname);
    } else {
        println!(
            "{} {} differs on {} (local {} {}B, remote {} {}B)",
            "DIFFERENT".yellow().bold(),
            name.cyan(),
            host.hostname,
            local.digest.short(),
            local.size,
            remote.digest.short(),
            remote.size
        );
    }

    Ok(if identical {
        Outcome::Clean.exit_code()
    } else {
        Outcome::Warnings.exit_code()
    })
}
