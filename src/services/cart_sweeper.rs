//! Periodic removal of abandoned session carts.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use crate::db::CartRepository;

/// How often idle carts are looked for.
pub const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

/// Deletes carts idle for longer than `ttl`, forever, every `every`.
/// Failures are logged and retried on the next tick.
pub async fn run(pool: PgPool, ttl: Duration, every: StdDuration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match CartRepository::new(&pool).purge_idle_since(Utc::now() - ttl).await {
            Ok(0) => tracing::debug!("No idle carts to purge"),
            Ok(purged) => tracing::info!(purged, "Purged idle carts"),
            Err(e) => tracing::warn!(error = %e, "Cart purge failed"),
        }
    }
}
