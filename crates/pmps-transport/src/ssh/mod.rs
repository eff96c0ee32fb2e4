//! Transport over the system `ssh` client
//!
//! Each operation is one remote shell command. When multiplexing is on, a
//! ControlMaster is started on first use and every later command rides the
//! same authenticated connection.
//!
//! # Authentication
//!
//! `ssh` always runs with `BatchMode=yes`, so it never prompts. The PLC must
//! accept a public key from [`SshOptions::identity_file`] or the running
//! agent. Password logins, including the factory `Administrator` password,
//! are not supported: install a key on each PLC before deploying to it. A
//! host that only offers password authentication is reported unreachable.

mod command;
mod listing;

pub use command::{SshCommand, shell_quote};
pub use listing::{parse_line, parse_listing};

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

use crate::transport::{RemoteEntry, Transport, remote_join};
use crate::{Error, Result};

/// Exit status `ssh` itself uses for connection and authentication errors.
const SSH_CONNECTION_FAILURE: i32 = 255;

/// User PLC file shares are administered as.
pub const DEFAULT_USER: &str = "Administrator";

/// Connection settings for [`SshTransport`].
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub user: Option<String>,
    pub port: Option<u16>,
    /// Key offered to the PLC. Password authentication is not available.
    pub identity_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Reuse one connection for all commands via a ControlMaster socket.
    pub multiplex: bool,
    pub program: OsString,
    /// Raw `-o` options passed through verbatim.
    pub extra_options: Vec<String>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            user: Some(DEFAULT_USER.to_string()),
            port: None,
            identity_file: None,
            connect_timeout: Duration::from_secs(10),
            multiplex: true,
            program: OsString::from("ssh"),
            extra_options: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct ControlSocket {
    dir: TempDir,
    path: PathBuf,
}

/// A session to one PLC over `ssh`.
#[derive(Debug)]
pub struct SshTransport {
    host: String,
    address: String,
    options: SshOptions,
    control: Option<ControlSocket>,
}

impl SshTransport {
    pub fn new(host: impl Into<String>, address: impl Into<String>, options: SshOptions) -> Self {
        Self {
            host: host.into(),
            address: address.into(),
            options,
            control: None,
        }
    }

    fn base_command(&self) -> SshCommand {
        let mut command = SshCommand::new(self.address.clone());
        command
            .set_program(self.options.program.clone())
            .set_connect_timeout(self.options.connect_timeout);
        if let Some(user) = &self.options.user {
            command.set_user(user.clone());
        }
        if let Some(port) = self.options.port {
            command.set_port(port);
        }
        if let Some(identity) = &self.options.identity_file {
            command.set_identity_file(identity.clone());
        }
        for option in &self.options.extra_options {
            command.push_option(format!("-o{option}"));
        }
        if let Some(control) = &self.control {
            command.set_control_path(&control.path);
        }
        command
    }

    /// Start the ControlMaster if multiplexing is on and none is running.
    async fn ensure_master(&mut self) -> Result<()> {
        if !self.options.multiplex || self.control.is_some() {
            return Ok(());
        }

        let dir = tempfile::Builder::new()
            .prefix("pmpsdb-ssh-")
            .tempdir()
            .map_err(|e| Error::unreachable(&self.host, format!("control socket directory: {e}")))?;
        let path = dir.path().join("ctl");
        let log_path = dir.path().join("master.log");
        let log = std::fs::File::create(&log_path)
            .map_err(|e| Error::unreachable(&self.host, format!("control log: {e}")))?;

        let mut command = self.base_command();
        command
            .set_control_path(&path)
            .push_option("-M")
            .push_option("-oControlPersist=60")
            .push_option("-f")
            .push_option("-N");

        // The backgrounded master inherits stderr; a pipe would never close.
        let status = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .status()
            .await
            .map_err(|e| Error::unreachable(&self.host, format!("failed to spawn ssh: {e}")))?;

        if !status.success() {
            let detail = std::fs::read_to_string(&log_path).unwrap_or_default();
            return Err(Error::unreachable(
                &self.host,
                format!("ssh master exited with {status}: {}", detail.trim()),
            ));
        }

        tracing::debug!(host = %self.host, socket = %path.display(), "ssh master started");
        self.control = Some(ControlSocket { dir, path });
        Ok(())
    }

    /// Run one remote command, feeding `stdin` if given.
    ///
    /// Connection-level failures become [`Error::HostUnreachable`]; any other
    /// exit status is returned to the caller in the [`Output`].
    async fn run(&mut self, remote: String, stdin: Option<Vec<u8>>) -> Result<Output> {
        self.ensure_master().await?;

        let mut command = self.base_command();
        command.push_remote_arg(remote.clone());
        tracing::trace!(host = %self.host, command = %remote, "ssh exec");

        let mut child = command
            .to_command()
            .spawn()
            .map_err(|e| Error::unreachable(&self.host, format!("failed to spawn ssh: {e}")))?;

        let writer = match (child.stdin.take(), stdin) {
            (Some(mut pipe), Some(data)) => Some(tokio::spawn(async move {
                let result = pipe.write_all(&data).await;
                drop(pipe);
                result
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::unreachable(&self.host, format!("ssh wait failed: {e}")))?;

        if let Some(writer) = writer {
            if let Ok(Err(e)) = writer.await {
                tracing::debug!(host = %self.host, error = %e, "stdin write ended early");
            }
        }

        if output.status.code() == Some(SSH_CONNECTION_FAILURE) {
            return Err(Error::unreachable(&self.host, stderr_text(&output)));
        }
        Ok(output)
    }
}

fn stderr_text(output: &Output) -> String {
    let text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if text.is_empty() {
        format!("exit status {}", output.status)
    } else {
        text
    }
}

/// Split `wc -c` output from the bytes that follow it.
fn split_count_header(stdout: &[u8]) -> Option<(u64, &[u8])> {
    let newline = stdout.iter().position(|b| *b == b'\n')?;
    let header = std::str::from_utf8(&stdout[..newline]).ok()?;
    let count = header.trim().parse().ok()?;
    Some((count, &stdout[newline + 1..]))
}

#[async_trait]
impl Transport for SshTransport {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>> {
        let output = self.run(format!("ls -l -D %s {}", shell_quote(dir)), None).await?;
        if !output.status.success() {
            tracing::debug!(host = %self.host, dir, stderr = %stderr_text(&output), "listing failed");
            return Err(Error::PathNotFound {
                host: self.host.clone(),
                path: dir.to_string(),
            });
        }
        Ok(parse_listing(&self.host, &String::from_utf8_lossy(&output.stdout)))
    }

    async fn read(&mut self, dir: &str, name: &str) -> Result<Vec<u8>> {
        let path = shell_quote(&remote_join(dir, name));
        let output = self.run(format!("wc -c < {path} && cat {path}"), None).await?;
        if !output.status.success() {
            return Err(Error::incomplete(&self.host, name, stderr_text(&output)));
        }

        let (expected, body) = split_count_header(&output.stdout)
            .ok_or_else(|| Error::incomplete(&self.host, name, "missing size header"))?;
        if body.len() as u64 != expected {
            return Err(Error::incomplete(
                &self.host,
                name,
                format!("received {} of {expected} bytes", body.len()),
            ));
        }
        Ok(body.to_vec())
    }

    async fn put(&mut self, dir: &str, name: &str, content: &[u8]) -> Result<u64> {
        let path = shell_quote(&remote_join(dir, name));
        let output = self
            .run(format!("cat > {path} && wc -c < {path}"), Some(content.to_vec()))
            .await?;
        if !output.status.success() {
            return Err(Error::write_failed(&self.host, name, stderr_text(&output)));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|_| Error::write_failed(&self.host, name, "unreadable byte count confirmation"))
    }

    async fn rename(&mut self, dir: &str, from: &str, to: &str) -> Result<()> {
        let remote = format!(
            "mv -f {} {}",
            shell_quote(&remote_join(dir, from)),
            shell_quote(&remote_join(dir, to))
        );
        let output = self.run(remote, None).await?;
        if !output.status.success() {
            return Err(Error::write_failed(&self.host, to, stderr_text(&output)));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(control) = self.control.take() else {
            return Ok(());
        };

        let mut command = self.base_command();
        command
            .set_control_path(&control.path)
            .push_option("-O")
            .push_option("exit");
        match command.to_command().stdin(Stdio::null()).output().await {
            Ok(output) if output.status.success() => {
                tracing::debug!(host = %self.host, "ssh master stopped");
            }
            Ok(output) => {
                tracing::debug!(host = %self.host, stderr = %stderr_text(&output), "ssh master stop failed");
            }
            Err(e) => {
                tracing::debug!(host = %self.host, error = %e, "ssh master stop failed");
            }
        }
        drop(control.dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_header_splits_body() {
        let (count, body) = split_count_header(b"   12\n{\"a\": true}").unwrap();
        assert_eq!(count, 12);
        assert_eq!(body, b"{\"a\": true}");
    }

    #[test]
    fn count_header_rejects_missing_newline() {
        assert!(split_count_header(b"12").is_none());
        assert!(split_count_header(b"nope\nbody").is_none());
    }

    #[test]
    fn base_command_carries_options() {
        let transport = SshTransport::new(
            "plc-tst-motion",
            "172.21.0.10",
            SshOptions {
                port: Some(22),
                extra_options: vec!["StrictHostKeyChecking=no".into()],
                ..SshOptions::default()
            },
        );

        let (_, args) = transport.base_command().command_parts();
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert!(args.contains(&"-oStrictHostKeyChecking=no".to_string()));
        assert_eq!(args.first().map(String::as_str), Some("-oBatchMode=yes"));
        assert_eq!(args.last().map(String::as_str), Some("Administrator@172.21.0.10"));
    }

    #[tokio::test]
    async fn missing_ssh_binary_is_unreachable() {
        let mut transport = SshTransport::new(
            "plc-tst-motion",
            "127.0.0.1",
            SshOptions {
                program: OsString::from("/nonexistent/pmpsdb-ssh"),
                multiplex: false,
                ..SshOptions::default()
            },
        );

        let err = transport.list("/Hard Disk/ftp/pmps").await.unwrap_err();
        assert!(err.is_connection_loss());
        transport.close().await.unwrap();
    }
}
