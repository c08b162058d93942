//! Background delivery retry loop
//!
//! Drains the durable queue on a fixed wall-clock interval, independently of
//! the reconciliation schedule: a stalled device session never blocks
//! delivery retries. The loop is the queue's single delivery authority.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use crate::db::queue::PendingQueue;

use super::api_client::Transport;

/// Owns the retry schedule for the pending queue.
pub struct DeliveryService {
    queue: PendingQueue,
    transport: Arc<dyn Transport>,
    interval_secs: u64,
}

impl DeliveryService {
    pub fn new(queue: PendingQueue, transport: Arc<dyn Transport>, interval_secs: u64) -> Self {
        Self {
            queue,
            transport,
            interval_secs,
        }
    }

    /// Spawn the retry loop. Runs until the process exits.
    pub fn run(self) -> tokio::task::JoinHandle<()> {
        info!("Starting delivery retry loop (interval: {}s)", self.interval_secs);

        tokio::spawn(async move {
            let mut timer = interval(Duration::from_secs(self.interval_secs));
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                timer.tick().await;

                if let Err(e) = self.queue.drain_once(self.transport.as_ref()).await {
                    error!("delivery retry pass failed: {e}");
                }
            }
        })
    }
}
