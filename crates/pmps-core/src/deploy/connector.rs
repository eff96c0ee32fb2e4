//! Creation of per-host transport sessions

use std::path::PathBuf;
use std::time::Duration;

use pmps_transport::{MountTransport, SshOptions, SshTransport, Transport};

use crate::config::{ResolvedConfig, TransportKind};
use crate::model::HostDescriptor;
use crate::{Error, Result};

/// Creates a fresh transport for one host.
///
/// Called once per host per run. Sessions are never shared between hosts
/// or between runs.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &HostDescriptor) -> pmps_transport::Result<Box<dyn Transport>>;
}

/// Connector for the transports configured in [`ResolvedConfig`].
#[derive(Debug, Clone)]
pub enum TransportConnector {
    Ssh(SshOptions),
    Mount { root: PathBuf },
}

impl TransportConnector {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        match config.transport {
            TransportKind::Ssh => Ok(Self::Ssh(SshOptions {
                user: config.user.clone(),
                port: Some(config.port),
                identity_file: config.identity_file.clone(),
                connect_timeout: config
                    .timeout
                    .map(|t| t.min(Duration::from_secs(30)))
                    .unwrap_or(Duration::from_secs(10)),
                extra_options: config.ssh_options.clone(),
                ..SshOptions::default()
            })),
            TransportKind::Mount => {
                let root = config.mount_root.clone().ok_or_else(|| Error::InvalidConfig {
                    message: "transport = \"mount\" requires defaults.mount_root".to_string(),
                })?;
                Ok(Self::Mount { root })
            }
        }
    }
}

impl Connector for TransportConnector {
    fn connect(&self, host: &HostDescriptor) -> pmps_transport::Result<Box<dyn Transport>> {
        Ok(match self {
            Self::Ssh(options) => Box::new(SshTransport::new(&host.hostname, &host.address, options.clone())),
            Self::Mount { root } => Box::new(MountTransport::new(&host.hostname, root.join(&host.hostname))),
        })
    }
}
