//! Expired Refresh Token Sweep
//!
//! Background task deleting expired refresh tokens on a fixed interval.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::refresh_token_store::RefreshTokenStore;
use crate::domain::repository::RefreshTokenRepository;

/// Spawn the periodic sweep
///
/// The first sweep runs one `interval` after spawning. Failures are logged
/// and the loop keeps going; abort the returned handle to stop it.
pub fn spawn_refresh_token_sweeper<R>(store: RefreshTokenStore<R>, interval: Duration) -> JoinHandle<()>
where
    R: RefreshTokenRepository + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = store.sweep().await {
                tracing::error!(error = %e, "Refresh token sweep failed");
            }
        }
    })
}
