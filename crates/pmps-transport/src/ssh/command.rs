//! Assembly of `ssh` invocations

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Quote a string for a POSIX-ish remote shell.
///
/// PLC database directories contain spaces (`/Hard Disk/ftp/pmps`), so every
/// path sent to the remote side goes through here.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Builder for one `ssh` command line.
#[derive(Debug, Clone)]
pub struct SshCommand {
    program: OsString,
    destination: String,
    user: Option<String>,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
    connect_timeout: Option<Duration>,
    control_path: Option<PathBuf>,
    options: Vec<OsString>,
    remote_args: Vec<OsString>,
}

impl SshCommand {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            program: OsString::from("ssh"),
            destination: destination.into(),
            user: None,
            port: None,
            identity_file: None,
            connect_timeout: None,
            control_path: None,
            options: Vec::new(),
            remote_args: Vec::new(),
        }
    }

    pub fn set_program(&mut self, program: impl Into<OsString>) -> &mut Self {
        self.program = program.into();
        self
    }

    pub fn set_user(&mut self, user: impl Into<String>) -> &mut Self {
        self.user = Some(user.into());
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    pub fn set_identity_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn set_control_path(&mut self, path: &Path) -> &mut Self {
        self.control_path = Some(path.to_path_buf());
        self
    }

    pub fn push_option(&mut self, option: impl Into<OsString>) -> &mut Self {
        self.options.push(option.into());
        self
    }

    pub fn push_remote_arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.remote_args.push(arg.into());
        self
    }

    fn target(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.destination),
            None => self.destination.clone(),
        }
    }

    /// Program and arguments, in invocation order.
    pub fn command_parts(&self) -> (OsString, Vec<OsString>) {
        let mut args: Vec<OsString> = vec![OsString::from("-oBatchMode=yes")];
        if let Some(timeout) = self.connect_timeout {
            args.push(OsString::from(format!(
                "-oConnectTimeout={}",
                timeout.as_secs().max(1)
            )));
        }
        if let Some(port) = self.port {
            args.push(OsString::from("-p"));
            args.push(OsString::from(port.to_string()));
        }
        if let Some(identity) = &self.identity_file {
            args.push(OsString::from("-i"));
            args.push(identity.clone().into_os_string());
        }
        if let Some(control) = &self.control_path {
            args.push(OsString::from("-S"));
            args.push(control.clone().into_os_string());
        }
        args.extend(self.options.iter().cloned());
        args.push(OsString::from(self.target()));
        args.extend(self.remote_args.iter().cloned());
        (self.program.clone(), args)
    }

    /// A tokio command with piped stdio that is killed if dropped mid-flight.
    pub fn to_command(&self) -> Command {
        let (program, args) = self.command_parts();
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}
