// src/tasks/raffle_conclusion.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::services::raffle_service::RaffleService;

/// Polls for raffles past their end time and concludes them.
///
/// The raffle rows themselves are the schedule: there is no in-memory
/// timer to lose, so conclusions (and repeat chaining) survive a process
/// restart. Announcement of the returned reports is the host layer's
/// job; this loop only logs them.
pub async fn run_raffle_conclusion_loop(service: Arc<RaffleService>, poll_interval: Duration) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        ticker.tick().await;
        match service.conclude_due().await {
            Ok(reports) => {
                for report in reports {
                    info!(
                        "concluded raffle '{}' in {}: winners {:?}",
                        report.raffle_name, report.channel_ref, report.winners
                    );
                }
            }
            Err(e) => {
                error!("raffle conclusion poll failed: {e}");
            }
        }
    }
}
