//! Periodic background cleanup.

use std::time::Duration;

use surrealdb::Connection;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::state::AppState;

/// Clear stale sessions and finished rate-limit windows every `every`.
/// Runs until the task is dropped.
pub async fn run_sweeper<C: Connection>(state: AppState<C>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let cleared = state.sessions().cleanup_expired_sessions().await;
        state.rate_limiter.prune(state.sessions().now());
        debug!(cleared, "sweep finished");
    }
}
