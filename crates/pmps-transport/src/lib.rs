//! Remote file-transfer sessions to PLC hosts
//!
//! A [`Transport`] is one session to one host's database directory. Two
//! implementations ship here:
//!
//! - [`SshTransport`]: drives the system `ssh` client against the PLC's
//!   shell, multiplexing every operation of a run over one control socket
//! - [`MountTransport`]: treats a locally mounted share as the remote side
//!
//! Writes are atomic from the PLC's point of view: content goes to a
//! temporary name in the target directory and is renamed over the target
//! only after the full byte count is confirmed.

pub mod error;
pub mod mount;
pub mod ssh;
pub mod transport;

pub use error::{Error, Result};
pub use mount::MountTransport;
pub use ssh::{SshOptions, SshTransport};
pub use transport::{RemoteEntry, TEMP_SUFFIX, Transport, is_temp_artifact, remote_join, temp_name};
