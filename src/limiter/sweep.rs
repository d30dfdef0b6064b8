use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use super::Counter;

/// Periodically drops drained buckets from `counter` until `shutdown`
/// resolves.
pub async fn run_sweeper<F>(counter: Arc<Counter>, every: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                debug!("sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let evicted = counter.sweep(Utc::now());
                if evicted > 0 {
                    debug!(evicted, tracked = counter.len(), "swept drained buckets");
                }
            }
        }
    }
}
