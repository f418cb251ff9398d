//! # Erasure Scheduler
//!
//! Two independent tickers: one feeds the queue processor, the other prunes
//! history. Both loops stop on the shared broadcast shutdown signal. A queue
//! tick that is still running when the next one is due delays it rather than
//! stacking up.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::history_pruner::HistoryPruner;
use super::queue_processor::{QueueProcessor, TickOutcome};
use crate::config::SchedulerConfig;

pub struct ErasureScheduler {
    processor: Arc<QueueProcessor>,
    pruner: Arc<HistoryPruner>,
    queue_tick: Duration,
    prune_interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ErasureScheduler {
    pub fn new(
        processor: Arc<QueueProcessor>,
        pruner: Arc<HistoryPruner>,
        config: &SchedulerConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            processor,
            pruner,
            queue_tick: config.queue_tick_interval(),
            prune_interval: config.history_prune_interval(),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handles.lock().iter().any(|handle| !handle.is_finished())
    }

    /// Spawn both loops; a second call while running is a no-op
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if handles.iter().any(|handle| !handle.is_finished()) {
            debug!("SCHEDULER: Already running");
            return;
        }
        handles.clear();

        info!(
            queue_tick_ms = self.queue_tick.as_millis() as u64,
            prune_interval_ms = self.prune_interval.as_millis() as u64,
            "SCHEDULER: Starting queue and history loops"
        );

        let processor = self.processor.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        let queue_tick = self.queue_tick;
        handles.push(tokio::spawn(async move {
            let mut ticker = interval(queue_tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let TickOutcome::Processed { request_id, status } = processor.tick().await {
                            debug!(request_id = %request_id, status = %status, "Queue tick processed request");
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("SCHEDULER: Queue loop shutting down");
                        break;
                    }
                }
            }
        }));

        let pruner = self.pruner.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        let prune_interval = self.prune_interval;
        handles.push(tokio::spawn(async move {
            let mut ticker = interval(prune_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        pruner.prune();
                    }
                    _ = shutdown.recv() => {
                        info!("SCHEDULER: History loop shutting down");
                        break;
                    }
                }
            }
        }));
    }

    /// Signal both loops and wait for them to finish.
    ///
    /// A request mid-pipeline runs to its terminal status first; the queue
    /// loop only observes shutdown between ticks.
    pub async fn stop(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        if handles.is_empty() {
            return;
        }

        // No receivers just means the loops already exited
        let _ = self.shutdown_tx.send(());

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "SCHEDULER: Loop task ended abnormally");
            }
        }
        info!("SCHEDULER: Stopped");
    }
}

impl std::fmt::Debug for ErasureScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasureScheduler")
            .field("queue_tick", &self.queue_tick)
            .field("prune_interval", &self.prune_interval)
            .field("running", &self.is_running())
            .finish()
    }
}
