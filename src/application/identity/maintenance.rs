//! Background task that periodically purges expired blacklist rows.
//!
//! A blacklisted token whose own expiry has passed would be rejected by the
//! expiry check anyway, so its row only costs space.

use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::tokens::SessionTokenIssuer;
use crate::shared::shutdown::ShutdownSignal;

/// Start the purge loop. It runs once immediately and then every
/// `interval_secs` until `shutdown` fires.
pub fn start_blacklist_purge_task(
    issuer: SessionTokenIssuer,
    shutdown: ShutdownSignal,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = interval_secs, "Blacklist purge task started");

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match issuer.purge_expired().await {
                        Ok(0) => debug!("no expired blacklist entries"),
                        Ok(removed) => info!(removed, "purged expired blacklist entries"),
                        Err(e) => warn!(error = %e, "blacklist purge failed"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("Blacklist purge task shutting down");
                    break;
                }
            }
        }
    })
}
