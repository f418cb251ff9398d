use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ConfigSummary;
use crate::state_machine::DeletionStatus;

/// Cumulative counters. These survive history pruning.
#[derive(Debug, Default)]
pub struct ErasureMetrics {
    received: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    processing_time_total_ms: AtomicU64,
    processed: AtomicU64,
}

impl ErasureMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_terminal(&self, status: DeletionStatus, processing_time_ms: Option<u64>) {
        match status {
            DeletionStatus::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            DeletionStatus::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            DeletionStatus::Cancelled => self.cancelled.fetch_add(1, Ordering::Relaxed),
            DeletionStatus::Pending | DeletionStatus::InProgress => return,
        };

        if let Some(ms) = processing_time_ms {
            self.processing_time_total_ms
                .fetch_add(ms, Ordering::Relaxed);
            self.processed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn counters(&self) -> MetricCounters {
        let processed = self.processed.load(Ordering::Relaxed);
        let total = self.processing_time_total_ms.load(Ordering::Relaxed);
        MetricCounters {
            received: self.received.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            average_processing_time_ms: (processed > 0).then(|| total / processed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricCounters {
    pub received: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub average_processing_time_ms: Option<u64>,
}

/// Point-in-time view reported by `get_statistics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErasureStatistics {
    pub received: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub active: usize,
    pub queued: usize,
    pub history_size: usize,
    pub average_processing_time_ms: Option<u64>,
    /// Active requests past their estimated completion time
    pub overdue: usize,
    pub legal_holds: usize,
    pub config: ConfigSummary,
}
