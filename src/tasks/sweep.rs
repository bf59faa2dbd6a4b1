//! Expiry Sweep Task
//!
//! Background task that periodically reclaims expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::WeakResponseCache;

/// Spawns a background task that sweeps expired entries every
/// `sweep_interval_secs` seconds (at least 1).
///
/// The task holds only a weak reference: it stops on its own once every
/// [`ResponseCache`](crate::cache::ResponseCache) handle is dropped, or when
/// the returned handle is aborted.
///
/// # Example
/// ```ignore
/// let cache = ResponseCache::new(&config);
/// let handle = spawn_sweep_task(cache.downgrade(), 120);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(cache: WeakResponseCache, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval_secs = sweep_interval_secs.max(1);
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, sweep task exiting");
                break;
            };

            let removed = cache.sweep_expired();
            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}
