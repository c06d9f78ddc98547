//! Origin-keyed pool of proxy handlers.
//!
//! The registry hands out one shared [`ProxyHandler`] per origin base URL.
//! Repeat acquisitions for the same base return the same handler, so every
//! caller targeting an origin goes through one client and one connection
//! pool. `shutdown` closes everything and refuses further acquisitions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::proxy::handler::ProxyHandler;
use crate::proxy::options::ProxyOptions;

#[derive(Default)]
struct Pool {
    handlers: HashMap<String, Arc<ProxyHandler>>,
    closed: bool,
}

/// Shared registry of per-origin proxy handlers.
pub struct ProxyRegistry {
    pool: Mutex<Pool>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self {
            pool: Mutex::new(Pool::default()),
        }
    }

    /// Get the handler for `options.base`, constructing it on first use.
    ///
    /// The raw base string is the pool key; two spellings of the same
    /// origin get two handlers. Options only take effect when the handler
    /// is constructed: later acquisitions with different options reuse the
    /// existing handler unchanged.
    pub async fn acquire(&self, options: ProxyOptions) -> anyhow::Result<Arc<ProxyHandler>> {
        let mut pool = self.pool.lock().await;

        if pool.closed {
            anyhow::bail!("proxy registry is shut down");
        }

        if let Some(existing) = pool.handlers.get(&options.base) {
            if options.request.request_timeout != existing.request_timeout() {
                tracing::debug!(
                    origin = %options.base,
                    "Acquire options differ from the pooled handler's; keeping the original"
                );
            }
            tracing::debug!(origin = %options.base, "Reusing pooled proxy handler");
            return Ok(Arc::clone(existing));
        }

        let handler = Arc::new(ProxyHandler::new(&options)?);
        pool.handlers.insert(options.base.clone(), Arc::clone(&handler));

        tracing::info!(
            origin = %options.base,
            pooled = pool.handlers.len(),
            "Created proxy handler"
        );

        Ok(handler)
    }

    /// Close every pooled handler and mark the registry shut down.
    ///
    /// Close failures are logged and skipped so one bad handler cannot
    /// keep the rest alive. Calling `shutdown` again is a no-op; `acquire`
    /// fails from the first call onward.
    pub async fn shutdown(&self) {
        let mut pool = self.pool.lock().await;

        if pool.closed {
            tracing::debug!("Proxy registry already shut down");
            return;
        }
        pool.closed = true;

        let handlers: Vec<_> = pool.handlers.drain().collect();
        drop(pool);

        for (base, handler) in handlers {
            if let Err(e) = handler.close() {
                tracing::warn!(origin = %base, error = %e, "Failed to close proxy handler");
            }
        }

        tracing::info!("Proxy registry shut down");
    }

    /// Number of handlers currently pooled.
    pub async fn handler_count(&self) -> usize {
        self.pool.lock().await.handlers.len()
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
