//! Explicitly invalidated discovery cache

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Discovery, HostRegistry};

/// Remembers the first discovery of `inner` until [`invalidate`] is called.
///
/// There is no expiry: stale descriptors are only dropped on request.
///
/// [`invalidate`]: CachedRegistry::invalidate
pub struct CachedRegistry<R> {
    inner: R,
    cached: Mutex<Option<Discovery>>,
}

impl<R: HostRegistry> CachedRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }

    /// Drop the cached descriptors. The next discovery asks `inner` again.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
        tracing::debug!("Host cache invalidated");
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: HostRegistry> HostRegistry for CachedRegistry<R> {
    async fn discover(&self) -> Discovery {
        let mut cached = self.cached.lock().await;
        if let Some(discovery) = cached.as_ref() {
            return discovery.clone();
        }
        let discovery = self.inner.discover().await;
        *cached = Some(discovery.clone());
        discovery
    }
}
