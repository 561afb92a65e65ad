use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;

use crate::cache::DomainCache;

/// Keeps the cache in line with the backend.
///
/// Reloads whenever a mutation is published and, as a fallback for writes made by
/// other processes, every `interval`. Failures are logged and the loop carries on.
pub fn spawn_refresher(cache: Arc<DomainCache>, interval: Duration) -> JoinHandle<()> {
    let mut events = cache.subscribe();

    tokio::spawn(async move {
        tracing::info!("Cache refresher started (fallback every {:?})", interval);
        let mut ticker = tokio::time::interval(interval);
        let mut invalidated = false;

        loop {
            let reason = if invalidated {
                "invalidated during reload"
            } else {
                tokio::select! {
                    _ = ticker.tick() => "interval",
                    received = events.recv() => match received {
                        Ok(event) if event.needs_reload() => "invalidated",
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Cache refresher skipped {} events", skipped);
                            "lagged"
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            };

            // Collapse a burst of invalidations into one reload.
            while let Ok(event) = events.try_recv() {
                tracing::trace!("Coalesced cache event {}", event.name());
            }

            match cache.refresh().await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("Cache refresh ({}) superseded", reason),
                Err(e) => tracing::error!("Cache refresh ({}) failed: {}", reason, e),
            }

            // Our own `Refreshed` is ignored; anything else published meanwhile
            // means the snapshot may be stale.
            invalidated = false;
            loop {
                match events.try_recv() {
                    Ok(event) => invalidated |= event.needs_reload(),
                    Err(TryRecvError::Lagged(_)) => invalidated = true,
                    Err(_) => break,
                }
            }
        }

        tracing::info!("Cache refresher stopped");
    })
}
