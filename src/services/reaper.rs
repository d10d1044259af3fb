//! Hold Reaper: a single long-running task that periodically releases
//! ticket holds whose last update is older than the configured hold
//! lifetime. Each sweep runs under its own short-lived timeout; failures
//! are logged and the next tick proceeds.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{config::ReservationConfig, seats};

const SWEEP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HoldReaper {
    pool: PgPool,
    config: ReservationConfig,
}

impl HoldReaper {
    pub fn new(pool: PgPool, config: ReservationConfig) -> Self {
        Self { pool, config }
    }

    /// Runs sweeps every `sweep_interval` until `cancel` fires. May start
    /// immediately; must stop cleanly on shutdown signal.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            hold_ttl_secs = self.config.hold_ttl.as_secs(),
            sweep_interval_secs = self.config.sweep_interval.as_secs(),
            "hold reaper starting"
        );

        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                _ = cancel.cancelled() => {
                    info!("hold reaper stopping on shutdown signal");
                    return;
                }
            }
        }
    }

    async fn sweep_once(&self) {
        let hold_ttl = self.config.hold_ttl;
        let outcome = tokio::time::timeout(SWEEP_TIMEOUT, seats::reclaim_stale(&self.pool, hold_ttl)).await;

        match outcome {
            Ok(Ok(count)) if count > 0 => {
                info!(reclaimed = count, "hold reaper reclaimed stale holds");
            }
            Ok(Ok(_)) => {
                tracing::debug!("hold reaper sweep found nothing to reclaim");
            }
            Ok(Err(err)) => {
                error!(error = %err, "hold reaper sweep failed");
            }
            Err(_) => {
                error!("hold reaper sweep timed out after {:?}", SWEEP_TIMEOUT);
            }
        }
    }
}
