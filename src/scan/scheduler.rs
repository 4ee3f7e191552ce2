//! Periodic sweep driver

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::ScanConfig;
use crate::scan::scanner::Scanner;
use crate::store::{ComponentSource, RuleStore, ViolationStore};

/// Run `scan_all` every `interval_ms` until `shutdown` completes.
///
/// The delay is measured from the end of one sweep to the start of the next,
/// so sweeps never overlap. A failed sweep is logged and the loop continues.
pub async fn run_periodic<C, R, V, F>(scanner: Scanner<C, R, V>, config: &ScanConfig, shutdown: F)
where
    C: ComponentSource,
    R: RuleStore,
    V: ViolationStore,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(Duration::from_millis(config.interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if !config.run_on_start {
        // First tick completes immediately
        interval.tick().await;
    }

    info!(
        "Rule violation scheduler started: interval={}ms, concurrency={}",
        config.interval_ms, config.concurrency
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Rule violation scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = scanner.scan_all(config.concurrency).await {
                    error!("Failed to execute scheduled rule violation scan: {}", e);
                }
                interval.reset();
            }
        }
    }
}
