//! Reachability probe for discovered hosts

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use super::Discovery;
use crate::model::{ErrorKind, ErrorRecord};

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Transport port to connect to.
    pub port: u16,
    pub timeout: Duration,
    pub max_concurrent: usize,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(2),
            max_concurrent: 32,
        }
    }
}

async fn connect(address: String, port: u16, probe_timeout: Duration) -> Result<(), String> {
    match timeout(probe_timeout, TcpStream::connect((address.as_str(), port))).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(format!("{address}:{port}: {e}")),
        Err(_elapsed) => Err(format!("{address}:{port}: no answer within {probe_timeout:?}")),
    }
}

/// Attempt a TCP connection to every host and record the result.
///
/// Unreachable hosts stay in the discovery with `reachable = false` and gain
/// a [`ErrorKind::HostUnreachable`] record.
pub async fn probe(discovery: &mut Discovery, options: &ProbeOptions) {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let mut tasks = JoinSet::new();
    for (index, host) in discovery.hosts.iter().enumerate() {
        let address = host.address.clone();
        let semaphore = semaphore.clone();
        let port = options.port;
        let probe_timeout = options.timeout;
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, connect(address, port, probe_timeout).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let Ok((index, result)) = joined else {
            continue;
        };
        let host = &mut discovery.hosts[index];
        match result {
            Ok(()) => host.reachable = true,
            Err(message) => {
                tracing::debug!(host = %host.hostname, %message, "Probe failed");
                host.reachable = false;
                discovery
                    .errors
                    .push(ErrorRecord::new(&host.hostname, None, ErrorKind::HostUnreachable, message));
            }
        }
    }
}
